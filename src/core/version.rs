// Native library version query.
use std::fmt;

use serde::Serialize;

use crate::core::native::{Driver, Librados};

/// Version of this binding crate.
pub const BINDING_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub struct Version {
    pub major: i32,
    pub minor: i32,
    pub extra: i32,
}

impl Version {
    pub const fn new(major: i32, minor: i32, extra: i32) -> Self {
        Self {
            major,
            minor,
            extra,
        }
    }

    pub fn as_tuple(&self) -> (i32, i32, i32) {
        (self.major, self.minor, self.extra)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.extra)
    }
}

/// Version of the linked librados; `0.0.0` when the crate is built unlinked.
pub fn version() -> Version {
    Librados.version()
}
