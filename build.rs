//! Purpose: Link the crate against the system librados when the `librados` feature is on.
//! Role: Cargo build-script; emits link directives and rebuild triggers.
//! Invariants: Without the feature nothing is linked and the driver stays unlinked.
//! Invariants: `RADOS_LIB_DIR` adds a native search path ahead of the system default.
//! Invariants: Uses only Cargo-provided env vars plus `RADOS_LIB_DIR`.
use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=RADOS_LIB_DIR");
    println!("cargo:rerun-if-changed=build.rs");

    if env::var_os("CARGO_FEATURE_LIBRADOS").is_none() {
        return;
    }

    if let Some(dir) = env::var_os("RADOS_LIB_DIR") {
        let dir = PathBuf::from(dir);
        if !dir.exists() {
            panic!(
                "RADOS_LIB_DIR points at {} which does not exist.\n\
                 Fix: install librados (e.g. librados-dev / librados2-devel) or unset RADOS_LIB_DIR \
                 to use the system search path.",
                dir.display()
            );
        }
        println!("cargo:rustc-link-search=native={}", dir.display());
    }

    println!("cargo:rustc-link-lib=rados");
}
