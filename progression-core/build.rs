// Keep the C exports visible in the Windows DLL
use std::env;

fn main() {
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("windows") {
        let target = env::var("TARGET").unwrap_or_default();

        if target.contains("gnu") {
            println!("cargo:rustc-cdylib-link-arg=-Wl,--export-all-symbols");
        } else if target.contains("msvc") {
            let def = format!(
                "{}/progression_core.def",
                env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into())
            );
            println!("cargo:rustc-cdylib-link-arg=/DEF:{def}");
        }
    }

    println!("cargo:rerun-if-changed=progression_core.def");
}
