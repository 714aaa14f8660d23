//! Progression Ledger
//!
//! The stateful core of a build. A [`CharacterProgression`] is a plain value;
//! every operation takes the current value and returns either the next value
//! or an [`EngineError`], leaving the input untouched. Callers keep the latest
//! value and replace it wholesale on success.
//!
//! Stage flow (not strictly linear, removals move backwards):
//! NoClass -> ClassSelected -> SpecializationEligible -> SpecializationSelected
//! -> LegendaryEligible -> LegendarySelected

use crate::catalog::{Ability, AbilityCatalog, ClassKind, SpecializationClass};
use crate::config::{BuildKind, ProgressionRules};
use crate::cost::{self, PriceTier};
use crate::eligibility::{self, EligibilityReport};
use crate::error::{EngineError, EngineResult};
use crate::gate;
use crate::tree_index::TreeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// The mutable aggregate of one build, owned by whoever drives the ledger
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharacterProgression {
    #[serde(default)]
    pub kind: BuildKind,
    pub primary_class_id: Option<String>,
    pub specialization_class_id: Option<String>,
    /// Insertion order is kept for display; membership has set semantics
    pub selected_ability_ids: Vec<String>,
    pub legendary_ability_id: Option<String>,
    pub current_tp: u32,
}

impl CharacterProgression {
    pub fn has_ability(&self, ability_id: &str) -> bool {
        self.selected_ability_ids.iter().any(|id| id == ability_id)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}

/// One queued ledger operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LedgerOp {
    SetPrimaryClass { class_id: String },
    SelectAbility { ability_id: String },
    RemoveAbility { ability_id: String },
    SetSpecialization { class_id: String },
    SelectLegendaryAbility { ability_id: String },
    RemoveLegendaryAbility,
}

impl LedgerOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetPrimaryClass { .. } => "set_primary_class",
            Self::SelectAbility { .. } => "select_ability",
            Self::RemoveAbility { .. } => "remove_ability",
            Self::SetSpecialization { .. } => "set_specialization",
            Self::SelectLegendaryAbility { .. } => "select_legendary_ability",
            Self::RemoveLegendaryAbility => "remove_legendary_ability",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProgressionStage {
    NoClass,
    ClassSelected,
    SpecializationEligible,
    SpecializationSelected,
    LegendaryEligible,
    LegendarySelected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeProgress {
    pub selected: usize,
    pub total: usize,
    pub next_level: u32,
    pub completed: bool,
    /// What the selections in this tree would cost at current prices
    pub tp_value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionSummary {
    pub stage: ProgressionStage,
    pub current_tp: u32,
    pub trees: BTreeMap<String, TreeProgress>,
    pub completed_trees: BTreeSet<String>,
    pub eligible_specializations: Vec<String>,
}

/// A broken invariant found on a progression from outside the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum InvariantViolation {
    UnknownClass { class_id: String },
    SelectionsWithoutClass,
    UnknownAbility { ability_id: String },
    DuplicateAbility { ability_id: String },
    TreeUnreachable { ability_id: String, tree: String },
    LevelGap { tree: String, missing_level: u32 },
    SpecializationIsCore { class_id: String },
    InvalidLegendary { ability_id: String },
}

struct BuildClasses<'c> {
    primary: &'c SpecializationClass,
    specialization: Option<&'c SpecializationClass>,
}

impl BuildClasses<'_> {
    fn tree_available(&self, tree: &str) -> bool {
        self.primary.has_core_tree(tree)
            || self.primary.grants_specialization_tree(tree)
            || self
                .specialization
                .is_some_and(|s| s.grants_specialization_tree(tree))
    }

    fn is_legendary(&self, ability: &Ability) -> bool {
        cost::is_legendary(ability, self.primary, self.specialization)
    }
}

/// Validated transitions over a [`CharacterProgression`].
/// Holds only read-only data, so one ledger can serve any number of builds.
pub struct ProgressionLedger<'a> {
    catalog: &'a AbilityCatalog,
    rules: ProgressionRules,
    index: TreeIndex,
}

impl<'a> ProgressionLedger<'a> {
    pub fn new(catalog: &'a AbilityCatalog, rules: ProgressionRules) -> Self {
        Self {
            catalog,
            rules,
            index: TreeIndex::by_tree(catalog.abilities()),
        }
    }

    pub fn with_default_rules(catalog: &'a AbilityCatalog) -> Self {
        Self::new(catalog, ProgressionRules::default())
    }

    pub fn catalog(&self) -> &AbilityCatalog {
        self.catalog
    }

    pub fn rules(&self) -> &ProgressionRules {
        &self.rules
    }

    /// Empty build with no class and the starting TP baseline
    pub fn new_progression(&self, kind: BuildKind) -> CharacterProgression {
        CharacterProgression {
            kind,
            current_tp: self.rules.starting_tp(kind),
            ..Default::default()
        }
    }

    pub fn create_progression(
        &self,
        primary_class_id: &str,
        kind: BuildKind,
    ) -> EngineResult<CharacterProgression> {
        self.set_primary_class(&self.new_progression(kind), primary_class_id)
    }

    pub fn apply(
        &self,
        progression: &CharacterProgression,
        op: &LedgerOp,
    ) -> EngineResult<CharacterProgression> {
        match op {
            LedgerOp::SetPrimaryClass { class_id } => self.set_primary_class(progression, class_id),
            LedgerOp::SelectAbility { ability_id } => self.select_ability(progression, ability_id),
            LedgerOp::RemoveAbility { ability_id } => self.remove_ability(progression, ability_id),
            LedgerOp::SetSpecialization { class_id } => {
                self.set_specialization(progression, class_id)
            }
            LedgerOp::SelectLegendaryAbility { ability_id } => {
                self.select_legendary_ability(progression, ability_id)
            }
            LedgerOp::RemoveLegendaryAbility => self.remove_legendary_ability(progression),
        }
    }

    // ========================
    // Transitions
    // ========================

    /// Trees are class-scoped, so everything downstream resets
    pub fn set_primary_class(
        &self,
        progression: &CharacterProgression,
        class_id: &str,
    ) -> EngineResult<CharacterProgression> {
        let result = self
            .class(class_id)
            .map(|class| CharacterProgression {
                primary_class_id: Some(class.id.clone()),
                ..self.new_progression(progression.kind)
            });
        log_transition("set_primary_class", class_id, result)
    }

    pub fn select_ability(
        &self,
        progression: &CharacterProgression,
        ability_id: &str,
    ) -> EngineResult<CharacterProgression> {
        let result = self.try_select_ability(progression, ability_id);
        log_transition("select_ability", ability_id, result)
    }

    fn try_select_ability(
        &self,
        progression: &CharacterProgression,
        ability_id: &str,
    ) -> EngineResult<CharacterProgression> {
        let classes = self.build_classes(progression)?;
        let ability = self.ability(ability_id)?;

        if classes.is_legendary(ability) {
            return Err(EngineError::LegendaryRequiresDedicatedSelection {
                ability_id: ability.id.clone(),
            });
        }
        if !classes.tree_available(&ability.tree) {
            return Err(EngineError::TreeNotAvailable {
                tree: ability.tree.clone(),
            });
        }

        let selected = self.selected_abilities(progression);
        let next_level = gate::lowest_available_level(&ability.tree, selected.iter().copied());
        // Also rejects re-selecting an ability already on the ladder
        if ability.level != next_level {
            return Err(EngineError::GateNotSatisfied {
                ability_id: ability.id.clone(),
                level: ability.level,
                next_level,
            });
        }

        let price = cost::cost(
            ability,
            Some(classes.primary),
            classes.specialization,
            &self.rules,
        );
        if progression.current_tp < price {
            return Err(EngineError::InsufficientResources {
                have: progression.current_tp,
                need: price,
            });
        }

        let mut next = progression.clone();
        next.selected_ability_ids.push(ability.id.clone());
        next.current_tp -= price;
        Ok(next)
    }

    /// Charges the flat retraining tax; the original price is not refunded
    pub fn remove_ability(
        &self,
        progression: &CharacterProgression,
        ability_id: &str,
    ) -> EngineResult<CharacterProgression> {
        let result = self.try_remove_ability(progression, ability_id);
        log_transition("remove_ability", ability_id, result)
    }

    fn try_remove_ability(
        &self,
        progression: &CharacterProgression,
        ability_id: &str,
    ) -> EngineResult<CharacterProgression> {
        if !progression.has_ability(ability_id) {
            return Err(match self.catalog.ability(ability_id) {
                None => EngineError::AbilityNotFound {
                    ability_id: ability_id.to_string(),
                },
                Some(_) => EngineError::NothingSelected {
                    target: ability_id.to_string(),
                },
            });
        }

        if self.rules.strict_removal {
            if let Some(ability) = self.catalog.ability(ability_id) {
                let selected = self.selected_abilities(progression);
                let next_level =
                    gate::lowest_available_level(&ability.tree, selected.iter().copied());
                if ability.level + 1 != next_level {
                    return Err(EngineError::GateNotSatisfied {
                        ability_id: ability.id.clone(),
                        level: ability.level,
                        next_level,
                    });
                }
            }
        }

        let tax = self.rules.retraining_tax;
        if progression.current_tp < tax {
            return Err(EngineError::InsufficientResources {
                have: progression.current_tp,
                need: tax,
            });
        }

        let mut next = progression.clone();
        next.selected_ability_ids.retain(|id| id != ability_id);
        next.current_tp -= tax;
        Ok(next)
    }

    /// Eligibility is re-checked here, not trusted from an earlier query
    pub fn set_specialization(
        &self,
        progression: &CharacterProgression,
        class_id: &str,
    ) -> EngineResult<CharacterProgression> {
        let result = self.try_set_specialization(progression, class_id);
        log_transition("set_specialization", class_id, result)
    }

    fn try_set_specialization(
        &self,
        progression: &CharacterProgression,
        class_id: &str,
    ) -> EngineResult<CharacterProgression> {
        let classes = self.build_classes(progression)?;
        let class = self.class(class_id)?;

        if progression.specialization_class_id.as_deref() == Some(class.id.as_str()) {
            return Ok(progression.clone());
        }

        if let Some(current) = classes.specialization {
            let invested = progression.legendary_ability_id.is_some()
                || self
                    .selected_abilities(progression)
                    .iter()
                    .any(|a| current.grants_specialization_tree(&a.tree));
            if invested {
                return Err(EngineError::SpecializationLocked {
                    current: current.id.clone(),
                });
            }
        }

        let selected = self.selected_abilities(progression);
        let eligible =
            eligibility::eligible_specializations(&selected, classes.primary, self.catalog, &self.rules);
        if !eligible.iter().any(|id| *id == class.id) {
            return Err(EngineError::SpecializationNotEligible {
                class_id: class.id.clone(),
            });
        }

        let mut next = progression.clone();
        next.specialization_class_id = Some(class.id.clone());
        Ok(next)
    }

    pub fn select_legendary_ability(
        &self,
        progression: &CharacterProgression,
        ability_id: &str,
    ) -> EngineResult<CharacterProgression> {
        let result = self.try_select_legendary(progression, ability_id);
        log_transition("select_legendary_ability", ability_id, result)
    }

    fn try_select_legendary(
        &self,
        progression: &CharacterProgression,
        ability_id: &str,
    ) -> EngineResult<CharacterProgression> {
        let classes = self.build_classes(progression)?;
        let ability = self.ability(ability_id)?;

        if let Some(current) = &progression.legendary_ability_id {
            return Err(EngineError::LegendaryAlreadySelected {
                current: current.clone(),
            });
        }
        let specialization = classes.specialization.ok_or(EngineError::NoSpecialization)?;
        if !classes.is_legendary(ability) {
            return Err(EngineError::NotLegendary {
                ability_id: ability.id.clone(),
            });
        }

        if let Some(tree) = &specialization.specialization_tree {
            let missing = self
                .index
                .tree(tree)
                .iter()
                .filter(|a| !classes.is_legendary(a) && !progression.has_ability(&a.id))
                .count();
            if missing > 0 {
                return Err(EngineError::SpecializationIncomplete {
                    tree: tree.clone(),
                    missing,
                });
            }
        }

        let price = PriceTier::Legendary.price(&self.rules);
        if progression.current_tp < price {
            return Err(EngineError::InsufficientResources {
                have: progression.current_tp,
                need: price,
            });
        }

        let mut next = progression.clone();
        next.legendary_ability_id = Some(ability.id.clone());
        next.current_tp -= price;
        Ok(next)
    }

    pub fn remove_legendary_ability(
        &self,
        progression: &CharacterProgression,
    ) -> EngineResult<CharacterProgression> {
        let result = self.try_remove_legendary(progression);
        log_transition("remove_legendary_ability", "legendary", result)
    }

    fn try_remove_legendary(
        &self,
        progression: &CharacterProgression,
    ) -> EngineResult<CharacterProgression> {
        if progression.legendary_ability_id.is_none() {
            return Err(EngineError::NothingSelected {
                target: "legendary".into(),
            });
        }
        let tax = self.rules.retraining_tax;
        if progression.current_tp < tax {
            return Err(EngineError::InsufficientResources {
                have: progression.current_tp,
                need: tax,
            });
        }

        let mut next = progression.clone();
        next.legendary_ability_id = None;
        next.current_tp -= tax;
        Ok(next)
    }

    // ========================
    // Queries
    // ========================

    pub fn eligibility_report(&self, progression: &CharacterProgression) -> EligibilityReport {
        match self.build_classes(progression) {
            Ok(classes) => {
                let selected = self.selected_abilities(progression);
                eligibility::evaluate(&selected, classes.primary, self.catalog, &self.rules)
            }
            Err(_) => EligibilityReport::default(),
        }
    }

    pub fn eligible_specializations(&self, progression: &CharacterProgression) -> Vec<String> {
        self.eligibility_report(progression).eligible
    }

    /// Abilities that currently pass the tree and gate checks, in catalog order.
    /// Affordability is not considered.
    pub fn selectable_abilities(&self, progression: &CharacterProgression) -> Vec<String> {
        let Ok(classes) = self.build_classes(progression) else {
            return Vec::new();
        };
        let selected = self.selected_abilities(progression);
        self.catalog
            .abilities()
            .iter()
            .filter(|a| {
                classes.tree_available(&a.tree)
                    && !classes.is_legendary(a)
                    && gate::is_selectable(a, selected.iter().copied())
            })
            .map(|a| a.id.clone())
            .collect()
    }

    pub fn is_selectable(&self, progression: &CharacterProgression, ability_id: &str) -> bool {
        self.selectable_abilities(progression)
            .iter()
            .any(|id| id == ability_id)
    }

    /// TP price of an ability for this build right now
    pub fn ability_cost(
        &self,
        progression: &CharacterProgression,
        ability_id: &str,
    ) -> EngineResult<u32> {
        let classes = self.build_classes(progression)?;
        let ability = self.ability(ability_id)?;
        Ok(cost::cost(
            ability,
            Some(classes.primary),
            classes.specialization,
            &self.rules,
        ))
    }

    /// Legendary abilities a `select_legendary_ability` call would accept now
    pub fn legendary_candidates(&self, progression: &CharacterProgression) -> Vec<String> {
        self.catalog
            .abilities()
            .iter()
            .filter(|a| self.try_select_legendary(progression, &a.id).is_ok())
            .map(|a| a.id.clone())
            .collect()
    }

    pub fn stage(&self, progression: &CharacterProgression) -> ProgressionStage {
        if progression.legendary_ability_id.is_some() {
            ProgressionStage::LegendarySelected
        } else if progression.specialization_class_id.is_some() {
            if self.legendary_candidates(progression).is_empty() {
                ProgressionStage::SpecializationSelected
            } else {
                ProgressionStage::LegendaryEligible
            }
        } else if progression.primary_class_id.is_none() {
            ProgressionStage::NoClass
        } else if self.eligible_specializations(progression).is_empty() {
            ProgressionStage::ClassSelected
        } else {
            ProgressionStage::SpecializationEligible
        }
    }

    pub fn summary(&self, progression: &CharacterProgression) -> ProgressionSummary {
        let selected = self.selected_abilities(progression);
        let classes = self.build_classes(progression).ok();
        let threshold = self.rules.tree_completion_threshold;

        let mut trees: BTreeMap<String, TreeProgress> = BTreeMap::new();
        for ability in &selected {
            let entry = trees.entry(ability.tree.clone()).or_insert_with(|| TreeProgress {
                selected: 0,
                total: self.index.tree(&ability.tree).len(),
                next_level: gate::lowest_available_level(&ability.tree, selected.iter().copied()),
                completed: false,
                tp_value: 0,
            });
            entry.selected += 1;
            entry.completed = entry.selected >= threshold;
            entry.tp_value += cost::cost(
                ability,
                classes.as_ref().map(|c| c.primary),
                classes.as_ref().and_then(|c| c.specialization),
                &self.rules,
            );
        }

        let completed_trees = trees
            .iter()
            .filter(|(_, t)| t.completed)
            .map(|(name, _)| name.clone())
            .collect();

        ProgressionSummary {
            stage: self.stage(progression),
            current_tp: progression.current_tp,
            trees,
            completed_trees,
            eligible_specializations: self.eligible_specializations(progression),
        }
    }

    /// Check a progression that did not come from this ledger (e.g. loaded
    /// from storage) against the build invariants. Empty means clean.
    pub fn audit(&self, progression: &CharacterProgression) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        let primary = match &progression.primary_class_id {
            Some(id) => match self.catalog.class(id) {
                Some(class) => Some(class),
                None => {
                    violations.push(InvariantViolation::UnknownClass {
                        class_id: id.clone(),
                    });
                    None
                }
            },
            None => {
                if !progression.selected_ability_ids.is_empty()
                    || progression.specialization_class_id.is_some()
                    || progression.legendary_ability_id.is_some()
                {
                    violations.push(InvariantViolation::SelectionsWithoutClass);
                }
                None
            }
        };

        let specialization = match &progression.specialization_class_id {
            Some(id) => match self.catalog.class(id) {
                Some(class) if class.kind == ClassKind::Core => {
                    violations.push(InvariantViolation::SpecializationIsCore {
                        class_id: id.clone(),
                    });
                    None
                }
                Some(class) => Some(class),
                None => {
                    violations.push(InvariantViolation::UnknownClass {
                        class_id: id.clone(),
                    });
                    None
                }
            },
            None => None,
        };

        let mut seen = HashSet::new();
        let mut levels: BTreeMap<&str, BTreeSet<u32>> = BTreeMap::new();
        for id in &progression.selected_ability_ids {
            if !seen.insert(id.as_str()) {
                violations.push(InvariantViolation::DuplicateAbility {
                    ability_id: id.clone(),
                });
                continue;
            }
            let Some(ability) = self.catalog.ability(id) else {
                violations.push(InvariantViolation::UnknownAbility {
                    ability_id: id.clone(),
                });
                continue;
            };
            if let Some(primary) = primary {
                let classes = BuildClasses {
                    primary,
                    specialization,
                };
                if !classes.tree_available(&ability.tree) {
                    violations.push(InvariantViolation::TreeUnreachable {
                        ability_id: id.clone(),
                        tree: ability.tree.clone(),
                    });
                }
            }
            levels.entry(ability.tree.as_str()).or_default().insert(ability.level);
        }

        for (tree, present) in levels {
            let top = present.iter().next_back().copied().unwrap_or(0);
            if let Some(missing_level) = (1..=top).find(|l| !present.contains(l)) {
                violations.push(InvariantViolation::LevelGap {
                    tree: tree.to_string(),
                    missing_level,
                });
            }
        }

        if let Some(id) = &progression.legendary_ability_id {
            let valid = match (primary, self.catalog.ability(id)) {
                (Some(primary), Some(ability)) => {
                    cost::is_legendary(ability, primary, specialization)
                }
                _ => false,
            };
            if !valid {
                violations.push(InvariantViolation::InvalidLegendary {
                    ability_id: id.clone(),
                });
            }
        }

        violations
    }

    // ========================
    // Internals
    // ========================

    fn ability(&self, ability_id: &str) -> EngineResult<&'a Ability> {
        self.catalog
            .ability(ability_id)
            .ok_or_else(|| EngineError::AbilityNotFound {
                ability_id: ability_id.to_string(),
            })
    }

    fn class(&self, class_id: &str) -> EngineResult<&'a SpecializationClass> {
        self.catalog
            .class(class_id)
            .ok_or_else(|| EngineError::ClassNotFound {
                class_id: class_id.to_string(),
            })
    }

    fn build_classes(&self, progression: &CharacterProgression) -> EngineResult<BuildClasses<'a>> {
        let primary_id = progression
            .primary_class_id
            .as_deref()
            .ok_or(EngineError::NoPrimaryClass)?;
        let primary = self.class(primary_id)?;
        let specialization = match progression.specialization_class_id.as_deref() {
            Some(id) => Some(self.class(id)?),
            None => None,
        };
        Ok(BuildClasses {
            primary,
            specialization,
        })
    }

    /// Selected abilities resolved against the catalog; unknown ids are skipped
    fn selected_abilities(&self, progression: &CharacterProgression) -> Vec<&'a Ability> {
        progression
            .selected_ability_ids
            .iter()
            .filter_map(|id| self.catalog.ability(id))
            .collect()
    }
}

fn log_transition(
    op: &'static str,
    subject: &str,
    result: EngineResult<CharacterProgression>,
) -> EngineResult<CharacterProgression> {
    match &result {
        Ok(next) => tracing::debug!(
            op,
            subject,
            tp = next.current_tp,
            selected = next.selected_ability_ids.len(),
            "transition committed"
        ),
        Err(err) => tracing::debug!(op, subject, error = err.kind(), "transition rejected: {err}"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::starter_catalog;

    fn hacker(ledger: &ProgressionLedger) -> CharacterProgression {
        ledger
            .create_progression("hacker", BuildKind::Character)
            .unwrap()
    }

    fn select_all(
        ledger: &ProgressionLedger,
        mut p: CharacterProgression,
        ids: &[&str],
    ) -> CharacterProgression {
        for id in ids {
            p = ledger.select_ability(&p, id).unwrap();
        }
        p
    }

    const SIX: [&str; 6] = ["hack_1", "hack_2", "hack_3", "tech_1", "tech_2", "tech_3"];

    #[test]
    fn test_new_progression_has_baseline() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = ledger.new_progression(BuildKind::Vehicle);
        assert_eq!(p.current_tp, ledger.rules().vehicle_starting_tp);
        assert!(p.primary_class_id.is_none());
        assert_eq!(ledger.stage(&p), ProgressionStage::NoClass);
    }

    #[test]
    fn test_select_without_class_fails() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = ledger.new_progression(BuildKind::Character);
        assert_eq!(
            ledger.select_ability(&p, "hack_1"),
            Err(EngineError::NoPrimaryClass)
        );
    }

    #[test]
    fn test_unknown_class() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let result = ledger.create_progression("wizard", BuildKind::Character);
        assert!(matches!(result, Err(EngineError::ClassNotFound { .. })));
    }

    #[test]
    fn test_select_debits_cost() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = hacker(&ledger);
        let start = p.current_tp;
        let p = ledger.select_ability(&p, "hack_1").unwrap();
        assert_eq!(p.current_tp, start - 1);
        assert_eq!(p.selected_ability_ids, vec!["hack_1".to_string()]);
    }

    #[test]
    fn test_reselect_is_gated() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = select_all(&ledger, hacker(&ledger), &["hack_1"]);
        assert!(matches!(
            ledger.select_ability(&p, "hack_1"),
            Err(EngineError::GateNotSatisfied { next_level: 2, .. })
        ));
    }

    #[test]
    fn test_tree_outside_build_rejected() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = hacker(&ledger);
        assert_eq!(
            ledger.select_ability(&p, "fire_1"),
            Err(EngineError::TreeNotAvailable {
                tree: "Firearms".into()
            })
        );
    }

    #[test]
    fn test_set_primary_class_resets_everything() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = select_all(&ledger, hacker(&ledger), &["hack_1", "tech_1"]);
        let p = ledger.set_primary_class(&p, "soldier").unwrap();
        assert_eq!(p.primary_class_id.as_deref(), Some("soldier"));
        assert!(p.selected_ability_ids.is_empty());
        assert_eq!(p.current_tp, ledger.rules().character_starting_tp);
    }

    #[test]
    fn test_remove_charges_tax_not_refund() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = select_all(&ledger, hacker(&ledger), &["hack_1"]);
        let before = p.current_tp;
        let p = ledger.remove_ability(&p, "hack_1").unwrap();
        assert_eq!(p.current_tp, before - 1);
        assert!(!p.has_ability("hack_1"));
    }

    #[test]
    fn test_remove_missing() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = hacker(&ledger);
        assert!(matches!(
            ledger.remove_ability(&p, "hack_1"),
            Err(EngineError::NothingSelected { .. })
        ));
        assert!(matches!(
            ledger.remove_ability(&p, "bogus"),
            Err(EngineError::AbilityNotFound { .. })
        ));
    }

    #[test]
    fn test_remove_with_empty_wallet_rejected() {
        let catalog = starter_catalog();
        let rules = ProgressionRules {
            character_starting_tp: 1,
            ..Default::default()
        };
        let ledger = ProgressionLedger::new(&catalog, rules);
        let p = select_all(&ledger, hacker(&ledger), &["hack_1"]);
        assert_eq!(p.current_tp, 0);
        assert_eq!(
            ledger.remove_ability(&p, "hack_1"),
            Err(EngineError::InsufficientResources { have: 0, need: 1 })
        );
    }

    #[test]
    fn test_lenient_removal_leaves_gap() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = select_all(&ledger, hacker(&ledger), &["hack_1", "hack_2"]);
        let p = ledger.remove_ability(&p, "hack_1").unwrap();
        assert_eq!(
            ledger.audit(&p),
            vec![InvariantViolation::LevelGap {
                tree: "Hacking".into(),
                missing_level: 1
            }]
        );
    }

    #[test]
    fn test_strict_removal_only_from_top() {
        let catalog = starter_catalog();
        let rules = ProgressionRules {
            strict_removal: true,
            ..Default::default()
        };
        let ledger = ProgressionLedger::new(&catalog, rules);
        let p = select_all(&ledger, hacker(&ledger), &["hack_1", "hack_2"]);
        assert!(matches!(
            ledger.remove_ability(&p, "hack_1"),
            Err(EngineError::GateNotSatisfied { .. })
        ));
        assert!(ledger.remove_ability(&p, "hack_2").is_ok());
    }

    #[test]
    fn test_specialization_requires_eligibility() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = select_all(&ledger, hacker(&ledger), &["hack_1", "hack_2", "hack_3"]);
        assert!(matches!(
            ledger.set_specialization(&p, "elite_hacker"),
            Err(EngineError::SpecializationNotEligible { .. })
        ));
        let p = select_all(&ledger, p, &["tech_1", "tech_2", "tech_3"]);
        let p = ledger.set_specialization(&p, "elite_hacker").unwrap();
        assert_eq!(p.specialization_class_id.as_deref(), Some("elite_hacker"));
        assert_eq!(ledger.stage(&p), ProgressionStage::SpecializationSelected);
    }

    #[test]
    fn test_specialization_unlocks_tree_at_premium() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = select_all(&ledger, hacker(&ledger), &SIX);
        let p = ledger.set_specialization(&p, "elite_hacker").unwrap();
        assert_eq!(ledger.ability_cost(&p, "net_1"), Ok(2));
        let before = p.current_tp;
        let p = ledger.select_ability(&p, "net_1").unwrap();
        assert_eq!(p.current_tp, before - 2);
    }

    #[test]
    fn test_specialization_swap_locked_after_investment() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = select_all(&ledger, hacker(&ledger), &SIX);
        let p = ledger.set_specialization(&p, "netrunner").unwrap();
        // Free to swap before investing
        let swapped = ledger.set_specialization(&p, "elite_hacker").unwrap();
        assert_eq!(swapped.specialization_class_id.as_deref(), Some("elite_hacker"));

        let p = ledger.select_ability(&p, "tmancy_1").unwrap();
        assert_eq!(
            ledger.set_specialization(&p, "elite_hacker"),
            Err(EngineError::SpecializationLocked {
                current: "netrunner".into()
            })
        );
        // Same class again is a no-op
        assert_eq!(ledger.set_specialization(&p, "netrunner"), Ok(p.clone()));
    }

    #[test]
    fn test_legendary_via_select_ability_rejected() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = select_all(&ledger, hacker(&ledger), &SIX);
        let p = ledger.set_specialization(&p, "elite_hacker").unwrap();
        let p = select_all(&ledger, p, &["net_1", "net_2", "net_3"]);
        assert!(matches!(
            ledger.select_ability(&p, "net_legend"),
            Err(EngineError::LegendaryRequiresDedicatedSelection { .. })
        ));
        assert!(!ledger.selectable_abilities(&p).contains(&"net_legend".to_string()));
    }

    #[test]
    fn test_legendary_flow() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = select_all(&ledger, hacker(&ledger), &SIX);
        assert_eq!(
            ledger.select_legendary_ability(&p, "net_legend"),
            Err(EngineError::NoSpecialization)
        );
        let p = ledger.set_specialization(&p, "elite_hacker").unwrap();
        let p = select_all(&ledger, p, &["net_1", "net_2", "net_3"]);
        assert_eq!(ledger.stage(&p), ProgressionStage::LegendaryEligible);
        assert_eq!(ledger.legendary_candidates(&p), vec!["net_legend".to_string()]);

        let before = p.current_tp;
        let p = ledger.select_legendary_ability(&p, "net_legend").unwrap();
        assert_eq!(p.current_tp, before - 3);
        assert_eq!(ledger.stage(&p), ProgressionStage::LegendarySelected);

        let p = ledger.remove_legendary_ability(&p).unwrap();
        assert_eq!(p.current_tp, before - 4);
        assert!(p.legendary_ability_id.is_none());
        assert!(matches!(
            ledger.remove_legendary_ability(&p),
            Err(EngineError::NothingSelected { .. })
        ));
    }

    #[test]
    fn test_non_legendary_rejected_as_legendary() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = select_all(&ledger, hacker(&ledger), &SIX);
        let p = ledger.set_specialization(&p, "elite_hacker").unwrap();
        assert!(matches!(
            ledger.select_legendary_ability(&p, "hack_4"),
            Err(EngineError::NotLegendary { .. })
        ));
        // Another class's legendary is not ours either
        assert!(matches!(
            ledger.select_legendary_ability(&p, "vang_legend"),
            Err(EngineError::NotLegendary { .. })
        ));
    }

    #[test]
    fn test_apply_dispatches() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = ledger.new_progression(BuildKind::Character);
        let p = ledger
            .apply(
                &p,
                &LedgerOp::SetPrimaryClass {
                    class_id: "hacker".into(),
                },
            )
            .unwrap();
        let p = ledger
            .apply(
                &p,
                &LedgerOp::SelectAbility {
                    ability_id: "tech_1".into(),
                },
            )
            .unwrap();
        assert!(p.has_ability("tech_1"));
    }

    #[test]
    fn test_ledger_op_json_shape() {
        let op: LedgerOp =
            serde_json::from_str(r#"{"op":"select_ability","ability_id":"hack_1"}"#).unwrap();
        assert_eq!(
            op,
            LedgerOp::SelectAbility {
                ability_id: "hack_1".into()
            }
        );
        assert_eq!(op.name(), "select_ability");
        let unit: LedgerOp = serde_json::from_str(r#"{"op":"remove_legendary_ability"}"#).unwrap();
        assert_eq!(unit, LedgerOp::RemoveLegendaryAbility);
    }

    #[test]
    fn test_selectable_abilities_for_fresh_hacker() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = hacker(&ledger);
        assert_eq!(
            ledger.selectable_abilities(&p),
            vec!["hack_1".to_string(), "tech_1".to_string()]
        );
    }

    #[test]
    fn test_summary_counts() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = select_all(&ledger, hacker(&ledger), &SIX);
        let summary = ledger.summary(&p);
        assert_eq!(summary.stage, ProgressionStage::SpecializationEligible);
        assert_eq!(summary.completed_trees.len(), 2);
        let hacking = &summary.trees["Hacking"];
        assert_eq!(hacking.selected, 3);
        assert_eq!(hacking.total, 4);
        assert_eq!(hacking.next_level, 4);
        assert_eq!(hacking.tp_value, 3);
    }

    #[test]
    fn test_audit_flags_tampered_progression() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let mut p = hacker(&ledger);
        p.selected_ability_ids = vec!["fire_1".into(), "fire_1".into(), "ghost".into()];
        p.legendary_ability_id = Some("hack_1".into());
        let violations = ledger.audit(&p);
        assert!(violations.contains(&InvariantViolation::TreeUnreachable {
            ability_id: "fire_1".into(),
            tree: "Firearms".into()
        }));
        assert!(violations.contains(&InvariantViolation::DuplicateAbility {
            ability_id: "fire_1".into()
        }));
        assert!(violations.contains(&InvariantViolation::UnknownAbility {
            ability_id: "ghost".into()
        }));
        assert!(violations.contains(&InvariantViolation::InvalidLegendary {
            ability_id: "hack_1".into()
        }));
    }

    #[test]
    fn test_progression_json_roundtrip() {
        let catalog = starter_catalog();
        let ledger = ProgressionLedger::with_default_rules(&catalog);
        let p = select_all(&ledger, hacker(&ledger), &["hack_1"]);
        let restored = CharacterProgression::from_json(&p.to_json()).unwrap();
        assert_eq!(restored, p);
    }
}
