//! Centralized rule constants for the progression engine.
//!
//! These are the compile-time defaults behind [`crate::config::ProgressionRules`].
//! Runtime code reads prices and thresholds from the rules value, never from here
//! directly, so a loaded rules file can override any of them.

// =====================================================
// Training Point prices
// =====================================================

/// Price of a legendary ability
pub const LEGENDARY_COST: u32 = 3;

/// Price of an ability in a specialization tree
pub const SPECIALIZATION_TREE_COST: u32 = 2;

/// Price of an ability in one of the primary class's core trees
pub const CORE_TREE_COST: u32 = 1;

/// Price of anything that matches no other rule
pub const FALLBACK_COST: u32 = 1;

/// Flat charge for removing an ability or a legendary (not a refund)
pub const RETRAINING_TAX: u32 = 1;

// =====================================================
// Starting budgets
// =====================================================

/// TP granted to a fresh character build
pub const CHARACTER_STARTING_TP: u32 = 25;

/// TP granted to a fresh vehicle build
pub const VEHICLE_STARTING_TP: u32 = 15;

// =====================================================
// Specialization eligibility
// =====================================================

/// Total selected abilities required before any specialization unlocks
pub const MIN_ABILITIES_FOR_SPECIALIZATION: usize = 6;

/// Selections in one tree for it to count as completed
pub const TREE_COMPLETION_THRESHOLD: usize = 3;

/// Version of the progression save envelope
pub const SAVE_FORMAT_VERSION: u32 = 1;
