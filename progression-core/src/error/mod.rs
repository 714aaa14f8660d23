//! Error taxonomy for the progression engine.
//!
//! Every rule violation is a recoverable value returned to the caller. The
//! engine never panics on an expected violation and never silently no-ops.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// A rejected ledger transition
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineError {
    #[error("no primary class selected")]
    NoPrimaryClass,

    #[error("ability not found: {ability_id}")]
    AbilityNotFound { ability_id: String },

    #[error("class not found: {class_id}")]
    ClassNotFound { class_id: String },

    #[error("tree {tree} is not available to this build")]
    TreeNotAvailable { tree: String },

    #[error("{ability_id} is level {level}, next selectable level in its tree is {next_level}")]
    GateNotSatisfied {
        ability_id: String,
        level: u32,
        next_level: u32,
    },

    #[error("insufficient training points: have {have}, need {need}")]
    InsufficientResources { have: u32, need: u32 },

    #[error("specialization {class_id} is not currently eligible")]
    SpecializationNotEligible { class_id: String },

    #[error("specialization {current} cannot be swapped while its tree has selections")]
    SpecializationLocked { current: String },

    #[error("no specialization selected")]
    NoSpecialization,

    #[error("specialization tree {tree} is incomplete: {missing} abilities left")]
    SpecializationIncomplete { tree: String, missing: usize },

    #[error("{ability_id} is not a legendary ability for this build")]
    NotLegendary { ability_id: String },

    #[error("{ability_id} is legendary and must go through legendary selection")]
    LegendaryRequiresDedicatedSelection { ability_id: String },

    #[error("legendary ability {current} is already selected")]
    LegendaryAlreadySelected { current: String },

    #[error("nothing to remove: {target}")]
    NothingSelected { target: String },
}

impl EngineError {
    /// Stable short name, used as a structured logging field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoPrimaryClass => "no_primary_class",
            Self::AbilityNotFound { .. } => "ability_not_found",
            Self::ClassNotFound { .. } => "class_not_found",
            Self::TreeNotAvailable { .. } => "tree_not_available",
            Self::GateNotSatisfied { .. } => "gate_not_satisfied",
            Self::InsufficientResources { .. } => "insufficient_resources",
            Self::SpecializationNotEligible { .. } => "specialization_not_eligible",
            Self::SpecializationLocked { .. } => "specialization_locked",
            Self::NoSpecialization => "no_specialization",
            Self::SpecializationIncomplete { .. } => "specialization_incomplete",
            Self::NotLegendary { .. } => "not_legendary",
            Self::LegendaryRequiresDedicatedSelection { .. } => {
                "legendary_requires_dedicated_selection"
            }
            Self::LegendaryAlreadySelected { .. } => "legendary_already_selected",
            Self::NothingSelected { .. } => "nothing_selected",
        }
    }
}

/// Failure to build or load an ability catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("duplicate ability id: {0}")]
    DuplicateAbility(String),
    #[error("duplicate class id: {0}")]
    DuplicateClass(String),
    #[error("ability {id} has invalid level {level} (levels start at 1)")]
    InvalidLevel { id: String, level: u32 },
    #[error("advanced class {class_id} points at unknown base class {base_id:?}")]
    UnknownBaseClass {
        class_id: String,
        base_id: Option<String>,
    },
    #[error("unsupported catalog format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Invalid progression rules
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid rule {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("unsupported rules format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Failure to read a persisted progression envelope
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("save version {found} is newer than supported version {supported}")]
    FutureVersion { found: u32, supported: u32 },
    #[error("save is missing a version")]
    MissingVersion,
    #[error("invalid save format: {0}")]
    InvalidFormat(#[from] serde_json::Error),
}
