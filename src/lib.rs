//! Purpose: Rust bindings for librados connection and pool handle lifecycles.
//! Exports: `api` (stable surface), `core` (handles, driver boundary, errors), `abi` (C ABI).
//! Role: Library backing the `radosbind` CLI, the C ABI, and host-language bindings.
//! Invariants: Native references never leave the handle that owns them.
//! Invariants: Handles are synchronous and unlocked; callers serialize access.
pub mod abi;
pub mod api;
pub mod core;
