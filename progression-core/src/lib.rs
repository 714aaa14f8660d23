//! Training Point Progression - Rules Engine
//!
//! Pure rules for building a tabletop character (or vehicle) by spending
//! Training Points on leveled ability trees:
//! - Tree index and level gating (one level at a time per tree)
//! - Ability pricing (legendary / specialization tree / core tree)
//! - Secondary specialization eligibility (advanced and hybrid classes)
//! - Progression ledger: atomic, validated transitions over a build
//! - Versioned save envelope and C-ABI bridge for host applications
//!
//! The ability catalog is read-only input. Rendering, storage and
//! confirmation prompts belong to the caller.

pub mod bridge;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod cost;
pub mod eligibility;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod logging;
pub mod snapshot;
pub mod tree_index;

pub use catalog::{Ability, AbilityCatalog, CatalogSource, ClassKind, SpecializationClass, TreeRequirement};
pub use config::{BuildKind, ProgressionRules};
pub use error::{EngineError, EngineResult};
pub use ledger::{CharacterProgression, LedgerOp, ProgressionLedger, ProgressionStage};
