//! Progression rules configuration.
//!
//! All prices and thresholds the engine uses come from [`ProgressionRules`].
//! `Default` reproduces the tabletop rules; a JSON or RON rules file can
//! override them per table.

use crate::constants::*;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What is being built. Both share one ledger; only the TP baseline differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BuildKind {
    #[default]
    Character,
    Vehicle,
}

impl BuildKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::Vehicle => "vehicle",
        }
    }

    pub fn from_id(id: u32) -> Self {
        match id {
            1 => Self::Vehicle,
            _ => Self::Character,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionRules {
    pub character_starting_tp: u32,
    pub vehicle_starting_tp: u32,
    pub legendary_cost: u32,
    pub specialization_tree_cost: u32,
    pub core_tree_cost: u32,
    pub fallback_cost: u32,
    pub retraining_tax: u32,
    pub min_abilities_for_specialization: usize,
    pub tree_completion_threshold: usize,
    /// Reject removing a level while a higher level of the same tree is selected
    pub strict_removal: bool,
}

impl Default for ProgressionRules {
    fn default() -> Self {
        Self {
            character_starting_tp: CHARACTER_STARTING_TP,
            vehicle_starting_tp: VEHICLE_STARTING_TP,
            legendary_cost: LEGENDARY_COST,
            specialization_tree_cost: SPECIALIZATION_TREE_COST,
            core_tree_cost: CORE_TREE_COST,
            fallback_cost: FALLBACK_COST,
            retraining_tax: RETRAINING_TAX,
            min_abilities_for_specialization: MIN_ABILITIES_FOR_SPECIALIZATION,
            tree_completion_threshold: TREE_COMPLETION_THRESHOLD,
            strict_removal: false,
        }
    }
}

impl ProgressionRules {
    pub fn starting_tp(&self, kind: BuildKind) -> u32 {
        match kind {
            BuildKind::Character => self.character_starting_tp,
            BuildKind::Vehicle => self.vehicle_starting_tp,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tree_completion_threshold == 0 {
            return Err(ConfigError::Invalid {
                field: "tree_completion_threshold",
                reason: "a tree cannot be completed with zero selections".into(),
            });
        }
        if self.retraining_tax == 0 {
            return Err(ConfigError::Invalid {
                field: "retraining_tax",
                reason: "removal must cost at least 1 TP".into(),
            });
        }
        if self.min_abilities_for_specialization < self.tree_completion_threshold {
            return Err(ConfigError::Invalid {
                field: "min_abilities_for_specialization",
                reason: format!(
                    "{} is below the tree completion threshold {}",
                    self.min_abilities_for_specialization, self.tree_completion_threshold
                ),
            });
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let rules: Self = serde_json::from_str(json)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn from_ron_str(ron_str: &str) -> Result<Self, ConfigError> {
        let rules: Self = ron::from_str(ron_str)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Load and validate a rules file, format chosen by extension
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let rules = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&contents)?,
            Some("ron") => Self::from_ron_str(&contents)?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        tracing::info!(path = %path.display(), "progression rules loaded");
        Ok(rules)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
