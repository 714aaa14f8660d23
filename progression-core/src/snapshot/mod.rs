//! Progression save envelope.
//!
//! Storage is someone else's job; this module only fixes the JSON shape handed
//! to it. Every save carries a `version`. Saves newer than this build, or with
//! no version at all, are refused rather than guessed at.

use crate::constants::SAVE_FORMAT_VERSION;
use crate::error::SnapshotError;
use crate::ledger::CharacterProgression;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionSave {
    pub version: u32,
    pub progression: CharacterProgression,
}

impl ProgressionSave {
    pub fn current(progression: CharacterProgression) -> Self {
        Self {
            version: SAVE_FORMAT_VERSION,
            progression,
        }
    }
}

pub fn to_save_json(progression: &CharacterProgression) -> String {
    serde_json::to_string(&ProgressionSave::current(progression.clone())).unwrap_or_default()
}

pub fn from_save_json(json: &str) -> Result<CharacterProgression, SnapshotError> {
    let data: Value = serde_json::from_str(json)?;

    let version = data
        .get("version")
        .and_then(Value::as_u64)
        .ok_or(SnapshotError::MissingVersion)? as u32;
    if version == 0 {
        return Err(SnapshotError::MissingVersion);
    }
    if version > SAVE_FORMAT_VERSION {
        return Err(SnapshotError::FutureVersion {
            found: version,
            supported: SAVE_FORMAT_VERSION,
        });
    }

    let save: ProgressionSave = serde_json::from_value(data)?;
    tracing::debug!(version, "progression save read");
    Ok(save.progression)
}
