/*
Purpose: Point the N-API addon at the radosbind C ABI library.
Exports: None (build script only).
Role: Emits the search path and `-l radosbind` for the addon's rb_* imports.
Invariants: An explicit RADOSBIND_LIB_DIR wins over the workspace target/debug then target/release.
Notes: Build the root crate first; the addon links the cdylib, not the Rust rlib.
*/

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=RADOSBIND_LIB_DIR");

    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR"));
    let repo_root = crate_dir
        .parent()
        .and_then(|path| path.parent())
        .and_then(|path| path.parent())
        .expect("bindings/node/native should be three levels below repo root")
        .to_path_buf();

    let candidates = env::var("RADOSBIND_LIB_DIR")
        .ok()
        .map(PathBuf::from)
        .into_iter()
        .chain([
            repo_root.join("target").join("debug"),
            repo_root.join("target").join("release"),
        ]);

    let lib_dir = candidates
        .into_iter()
        .find(|candidate| candidate.exists())
        .unwrap_or_else(|| {
            panic!(
                "libradosbind not found; set RADOSBIND_LIB_DIR or build target/debug/libradosbind.*"
            )
        });

    println!("cargo:rustc-link-search=native={}", lib_dir.display());
    println!("cargo:rustc-link-lib=radosbind");
}
