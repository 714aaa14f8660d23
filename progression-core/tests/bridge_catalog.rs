//! Session catalog and rules replacement through the bridge.
//!
//! Kept to a single test: loading a catalog changes process-wide state that
//! every other bridge call observes.

use progression_core::bridge::*;
use std::ffi::{CStr, CString};

fn take(ptr: *mut std::os::raw::c_char) -> String {
    assert!(!ptr.is_null(), "FFI returned null pointer");
    let s = unsafe { CStr::from_ptr(ptr).to_str().unwrap().to_owned() };
    free_string(ptr);
    s
}

fn cstr(s: &str) -> CString {
    CString::new(s).unwrap()
}

const MECH_CATALOG: &str = r#"{
    "abilities": [
        {"id": "arm_1", "name": "Plating", "tree": "Armor", "level": 1},
        {"id": "arm_2", "name": "Reactive Plating", "tree": "Armor", "level": 2},
        {"id": "gun_1", "name": "Autocannon", "tree": "Guns", "level": 1}
    ],
    "classes": [
        {"id": "mech", "name": "Mech", "kind": "Core", "core_trees": ["Armor", "Guns"]}
    ],
    "tree_requirements": []
}"#;

#[test]
fn load_use_and_reset_session_catalog() {
    logging_init(3);

    let bad = cstr(r#"{"abilities": [{"id": "x", "name": "X", "tree": "T", "level": 0}]}"#);
    assert!(!catalog_load_json(bad.as_ptr()));

    let catalog = cstr(MECH_CATALOG);
    assert!(catalog_load_json(catalog.as_ptr()));

    let listed: serde_json::Value = serde_json::from_str(&take(catalog_get())).unwrap();
    assert_eq!(listed["classes"][0]["id"], "mech");

    // Starter classes are gone while the mech catalog is loaded
    let hacker = cstr("hacker");
    assert!(progression_create(hacker.as_ptr(), 0).is_null());

    let rules = cstr(r#"{"vehicle_starting_tp": 4}"#);
    assert!(rules_load_json(rules.as_ptr()));

    let mech = cstr("mech");
    let p: serde_json::Value = serde_json::from_str(&take(progression_create(mech.as_ptr(), 1))).unwrap();
    assert_eq!(p["kind"], "Vehicle");
    assert_eq!(p["current_tp"], 4);

    let input = cstr(&p.to_string());
    let selectable: Vec<String> =
        serde_json::from_str(&take(progression_selectable_abilities(input.as_ptr()))).unwrap();
    assert_eq!(selectable, vec!["arm_1".to_string(), "gun_1".to_string()]);

    catalog_reset();
    let p = take(progression_create(hacker.as_ptr(), 0));
    assert!(p.contains("\"current_tp\":25"));
}
