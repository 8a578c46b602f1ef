//! Purpose: Define the stable public Rust API boundary for radosbind.
//! Exports: Handle types, drivers, configuration profiles, errors, and version query.
//! Role: Public, additive-only surface used by the CLI, the C ABI, and downstream crates.
//! Invariants: Raw native types stay behind `Driver`; nothing here exposes a pointer.

pub use crate::core::cluster::{ClusterHandle, ClusterState};
pub use crate::core::conf::{CONF_VALUE_CAPACITY, ClusterOptions, DEFAULT_CLUSTER_NAME};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::native::{Driver, Librados, MemoryCluster, NativeResult};
pub use crate::core::pool::PoolHandle;
pub use crate::core::version::{BINDING_VERSION, Version, version};
