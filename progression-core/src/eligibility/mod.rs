//! Eligibility Resolver
//!
//! Which secondary specializations the current selections unlock:
//! - nothing below the minimum total selection count
//! - nothing for a primary class whose policy shuts off specialization
//! - a Hybrid class when one of its required trees is completed
//! - the advanced version of the primary class when one of the primary's
//!   core trees is completed
//!
//! Always recomputed from the current selections; eligibility is never a
//! one-way ratchet.

use crate::catalog::{Ability, AbilityCatalog, ClassKind, SpecializationClass};
use crate::config::ProgressionRules;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Why the resolver reached its answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EligibilityBlock {
    TooFewAbilities,
    ClassCannotSpecialize,
    NoCompletedTree,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EligibilityReport {
    pub total_selected: usize,
    pub completed_trees: BTreeSet<String>,
    /// Hybrids in catalog order, then the advanced version of the primary
    pub eligible: Vec<String>,
    pub blocked_by: Option<EligibilityBlock>,
}

/// Trees with at least `threshold` selected abilities
pub fn completed_trees<'a>(
    selected: impl IntoIterator<Item = &'a Ability>,
    threshold: usize,
) -> BTreeSet<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for ability in selected {
        *counts.entry(ability.tree.as_str()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n >= threshold)
        .map(|(tree, _)| tree.to_string())
        .collect()
}

pub fn evaluate(
    selected: &[&Ability],
    primary: &SpecializationClass,
    catalog: &AbilityCatalog,
    rules: &ProgressionRules,
) -> EligibilityReport {
    let mut report = EligibilityReport {
        total_selected: selected.len(),
        ..Default::default()
    };

    if selected.len() < rules.min_abilities_for_specialization {
        report.blocked_by = Some(EligibilityBlock::TooFewAbilities);
        return report;
    }
    if !primary.allows_specialization {
        report.blocked_by = Some(EligibilityBlock::ClassCannotSpecialize);
        return report;
    }

    report.completed_trees =
        completed_trees(selected.iter().copied(), rules.tree_completion_threshold);
    if report.completed_trees.is_empty() {
        report.blocked_by = Some(EligibilityBlock::NoCompletedTree);
        return report;
    }

    for hybrid in catalog
        .classes()
        .iter()
        .filter(|c| c.kind == ClassKind::Hybrid)
    {
        let unlocked = hybrid
            .specialization_tree
            .as_deref()
            .and_then(|tree| catalog.tree_requirement(tree))
            .is_some_and(|req| {
                req.required_trees
                    .iter()
                    .any(|t| report.completed_trees.contains(t))
            });
        if unlocked {
            report.eligible.push(hybrid.id.clone());
        }
    }

    let core_completed = primary
        .core_trees
        .iter()
        .any(|t| report.completed_trees.contains(t));
    if core_completed {
        if let Some(advanced) = catalog.advanced_version_of(&primary.id) {
            report.eligible.push(advanced.id.clone());
        }
    }

    tracing::trace!(
        primary = %primary.id,
        completed = report.completed_trees.len(),
        eligible = report.eligible.len(),
        "eligibility evaluated"
    );
    report
}

pub fn eligible_specializations(
    selected: &[&Ability],
    primary: &SpecializationClass,
    catalog: &AbilityCatalog,
    rules: &ProgressionRules,
) -> Vec<String> {
    evaluate(selected, primary, catalog, rules).eligible
}
