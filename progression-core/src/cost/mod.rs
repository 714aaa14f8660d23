//! Cost Resolver
//!
//! TP price of an ability for a given primary class and optional
//! specialization. Rules are checked in precedence order, first match wins:
//! legendary, specialization tree, core tree, fallback.

use crate::catalog::{Ability, SpecializationClass};
use crate::config::ProgressionRules;
use serde::{Deserialize, Serialize};

/// Which pricing rule matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceTier {
    Legendary,
    SpecializationTree,
    CoreTree,
    Fallback,
    /// No primary class yet; the ledger rejects before this price matters
    Unpriced,
}

impl PriceTier {
    pub fn price(&self, rules: &ProgressionRules) -> u32 {
        match self {
            Self::Legendary => rules.legendary_cost,
            Self::SpecializationTree => rules.specialization_tree_cost,
            Self::CoreTree => rules.core_tree_cost,
            Self::Fallback => rules.fallback_cost,
            Self::Unpriced => 0,
        }
    }
}

/// Ability name appears in the legendary set of the primary or specialization class
pub fn is_legendary(
    ability: &Ability,
    primary: &SpecializationClass,
    specialization: Option<&SpecializationClass>,
) -> bool {
    primary.has_legendary(&ability.name)
        || specialization.is_some_and(|s| s.has_legendary(&ability.name))
}

pub fn price_tier(
    ability: &Ability,
    primary: Option<&SpecializationClass>,
    specialization: Option<&SpecializationClass>,
) -> PriceTier {
    let Some(primary) = primary else {
        return PriceTier::Unpriced;
    };

    if is_legendary(ability, primary, specialization) {
        PriceTier::Legendary
    } else if primary.grants_specialization_tree(&ability.tree)
        || specialization.is_some_and(|s| s.grants_specialization_tree(&ability.tree))
    {
        PriceTier::SpecializationTree
    } else if primary.has_core_tree(&ability.tree) {
        PriceTier::CoreTree
    } else {
        PriceTier::Fallback
    }
}

pub fn cost(
    ability: &Ability,
    primary: Option<&SpecializationClass>,
    specialization: Option<&SpecializationClass>,
    rules: &ProgressionRules,
) -> u32 {
    price_tier(ability, primary, specialization).price(rules)
}
