//! FFI Bridge Layer: progression engine <-> host application
//!
//! C-ABI functions for hosts that load the engine as a shared library.
//! Progressions, operations and results cross the boundary as JSON.
//! Every returned string is heap-allocated; the caller frees it with `free_string`.
//! Null or malformed input yields null, never a crash.

use serde::{Deserialize, Serialize};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::{OnceLock, RwLock};

use crate::catalog::{starter_catalog, AbilityCatalog};
use crate::config::{BuildKind, ProgressionRules};
use crate::error::EngineError;
use crate::ledger::{CharacterProgression, LedgerOp, ProgressionLedger};
use crate::logging::{self, LogLevel, TracingConfig};
use crate::snapshot;

static LOADED_CATALOG: RwLock<Option<AbilityCatalog>> = RwLock::new(None);
static LOADED_RULES: RwLock<Option<ProgressionRules>> = RwLock::new(None);
static STARTER_CATALOG: OnceLock<AbilityCatalog> = OnceLock::new();

/// Result of `progression_apply`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApplyResponse {
    pub ok: bool,
    /// The committed progression, or the unchanged input on rejection
    pub progression: CharacterProgression,
    pub error: Option<EngineError>,
}

// ========================
// Helpers
// ========================

fn json_to_cstring<T: Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => CString::new(json).unwrap_or_default().into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

fn parse_cstr(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_owned()) }
}

fn parse_progression(ptr: *const c_char) -> Option<CharacterProgression> {
    parse_cstr(ptr).and_then(|s| CharacterProgression::from_json(&s))
}

/// Run `f` against a ledger over the loaded catalog (or the starter catalog)
fn with_ledger<T>(f: impl FnOnce(&ProgressionLedger) -> T) -> Option<T> {
    let rules = LOADED_RULES.read().ok()?.clone().unwrap_or_default();
    let loaded = LOADED_CATALOG.read().ok()?;
    let catalog = match loaded.as_ref() {
        Some(catalog) => catalog,
        None => STARTER_CATALOG.get_or_init(starter_catalog),
    };
    let ledger = ProgressionLedger::new(catalog, rules);
    Some(f(&ledger))
}

// ========================
// C-ABI: Core
// ========================

/// Version string
#[no_mangle]
pub extern "C" fn get_version() -> *mut c_char {
    CString::new(env!("CARGO_PKG_VERSION"))
        .unwrap_or_default()
        .into_raw()
}

/// Free a string allocated by Rust.
/// ptr must come from a prior call into this library, or be null.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            drop(CString::from_raw(ptr));
        }
    }
}

/// Install a tracing subscriber at the given level (0=trace .. 4=error)
#[no_mangle]
pub extern "C" fn logging_init(level_id: u32) {
    logging::init_tracing(&TracingConfig {
        default_level: LogLevel::from_id(level_id),
        ..Default::default()
    });
}

// ========================
// C-ABI: Catalog & Rules
// ========================

/// Replace the session catalog. Returns false if the JSON is invalid.
#[no_mangle]
pub extern "C" fn catalog_load_json(catalog_json: *const c_char) -> bool {
    let _span = logging::TimingSpan::new("catalog_load_json");
    let Some(json) = parse_cstr(catalog_json) else {
        return false;
    };
    match AbilityCatalog::from_json_str(&json) {
        Ok(catalog) => match LOADED_CATALOG.write() {
            Ok(mut slot) => {
                tracing::info!(
                    abilities = catalog.abilities().len(),
                    classes = catalog.classes().len(),
                    "session catalog replaced"
                );
                *slot = Some(catalog);
                true
            }
            Err(_) => false,
        },
        Err(e) => {
            tracing::warn!("catalog rejected: {e}");
            false
        }
    }
}

/// Drop any loaded catalog and rules, back to the built-in defaults
#[no_mangle]
pub extern "C" fn catalog_reset() {
    if let Ok(mut slot) = LOADED_CATALOG.write() {
        *slot = None;
    }
    if let Ok(mut slot) = LOADED_RULES.write() {
        *slot = None;
    }
}

/// Current catalog as JSON
#[no_mangle]
pub extern "C" fn catalog_get() -> *mut c_char {
    match with_ledger(|ledger| ledger.catalog().data().clone()) {
        Some(data) => json_to_cstring(&data),
        None => std::ptr::null_mut(),
    }
}

/// Replace the session rules. Returns false if invalid.
#[no_mangle]
pub extern "C" fn rules_load_json(rules_json: *const c_char) -> bool {
    let Some(json) = parse_cstr(rules_json) else {
        return false;
    };
    match ProgressionRules::from_json_str(&json) {
        Ok(rules) => match LOADED_RULES.write() {
            Ok(mut slot) => {
                *slot = Some(rules);
                true
            }
            Err(_) => false,
        },
        Err(e) => {
            tracing::warn!("rules rejected: {e}");
            false
        }
    }
}

// ========================
// C-ABI: Progression
// ========================

/// New progression for a primary class (kind: 0=character, 1=vehicle).
/// Null if the class is unknown.
#[no_mangle]
pub extern "C" fn progression_create(class_id: *const c_char, kind_id: u32) -> *mut c_char {
    let Some(class_id) = parse_cstr(class_id) else {
        return std::ptr::null_mut();
    };
    let kind = BuildKind::from_id(kind_id);
    match with_ledger(|ledger| ledger.create_progression(&class_id, kind)) {
        Some(Ok(progression)) => json_to_cstring(&progression),
        _ => std::ptr::null_mut(),
    }
}

/// Apply one `LedgerOp` and return an `ApplyResponse`.
/// Rule violations come back as `ok: false`; null only for malformed input.
#[no_mangle]
pub extern "C" fn progression_apply(
    progression_json: *const c_char,
    op_json: *const c_char,
) -> *mut c_char {
    let Some(progression) = parse_progression(progression_json) else {
        return std::ptr::null_mut();
    };
    let op: LedgerOp = match parse_cstr(op_json).map(|s| serde_json::from_str(&s)) {
        Some(Ok(op)) => op,
        _ => return std::ptr::null_mut(),
    };

    let response = with_ledger(|ledger| match ledger.apply(&progression, &op) {
        Ok(next) => ApplyResponse {
            ok: true,
            progression: next,
            error: None,
        },
        Err(err) => ApplyResponse {
            ok: false,
            progression: progression.clone(),
            error: Some(err),
        },
    });
    match response {
        Some(response) => json_to_cstring(&response),
        None => std::ptr::null_mut(),
    }
}

/// Eligible specialization class ids as a JSON array
#[no_mangle]
pub extern "C" fn progression_eligible_specializations(
    progression_json: *const c_char,
) -> *mut c_char {
    let Some(progression) = parse_progression(progression_json) else {
        return std::ptr::null_mut();
    };
    match with_ledger(|ledger| ledger.eligible_specializations(&progression)) {
        Some(ids) => json_to_cstring(&ids),
        None => std::ptr::null_mut(),
    }
}

/// Ability ids that pass the gate right now, as a JSON array
#[no_mangle]
pub extern "C" fn progression_selectable_abilities(
    progression_json: *const c_char,
) -> *mut c_char {
    let Some(progression) = parse_progression(progression_json) else {
        return std::ptr::null_mut();
    };
    match with_ledger(|ledger| ledger.selectable_abilities(&progression)) {
        Some(ids) => json_to_cstring(&ids),
        None => std::ptr::null_mut(),
    }
}

/// Per-tree progress, stage and eligibility
#[no_mangle]
pub extern "C" fn progression_summary(progression_json: *const c_char) -> *mut c_char {
    let Some(progression) = parse_progression(progression_json) else {
        return std::ptr::null_mut();
    };
    match with_ledger(|ledger| ledger.summary(&progression)) {
        Some(summary) => json_to_cstring(&summary),
        None => std::ptr::null_mut(),
    }
}

/// Invariant violations as a JSON array (empty when clean)
#[no_mangle]
pub extern "C" fn progression_audit(progression_json: *const c_char) -> *mut c_char {
    let Some(progression) = parse_progression(progression_json) else {
        return std::ptr::null_mut();
    };
    match with_ledger(|ledger| ledger.audit(&progression)) {
        Some(violations) => json_to_cstring(&violations),
        None => std::ptr::null_mut(),
    }
}

/// Wrap a progression in the versioned save envelope
#[no_mangle]
pub extern "C" fn progression_to_save(progression_json: *const c_char) -> *mut c_char {
    match parse_progression(progression_json) {
        Some(progression) => CString::new(snapshot::to_save_json(&progression))
            .unwrap_or_default()
            .into_raw(),
        None => std::ptr::null_mut(),
    }
}

/// Unwrap a save envelope; null if the version is unsupported or the JSON is bad
#[no_mangle]
pub extern "C" fn progression_from_save(save_json: *const c_char) -> *mut c_char {
    let Some(json) = parse_cstr(save_json) else {
        return std::ptr::null_mut();
    };
    match snapshot::from_save_json(&json) {
        Ok(progression) => json_to_cstring(&progression),
        Err(e) => {
            tracing::warn!("save rejected: {e}");
            std::ptr::null_mut()
        }
    }
}
