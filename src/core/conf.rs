//! Purpose: Configuration plumbing for cluster handles.
//! Exports: `ConfBuf`, `CONF_VALUE_CAPACITY`, `ClusterOptions`, `DEFAULT_CLUSTER_NAME`.
//! Role: Bounded read-back buffer for native config values, plus JSON profiles.
//! Invariants: A value that does not fit the buffer is an error, never truncated.
//! Invariants: Profiles reject unknown fields so typos surface early.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind};

/// Capacity of the config read-back buffer: 1023 value bytes plus the terminator.
pub const CONF_VALUE_CAPACITY: usize = 1024;

pub const DEFAULT_CLUSTER_NAME: &str = "ceph";

/// Fixed-capacity buffer the native library writes a NUL-terminated value into.
pub struct ConfBuf {
    bytes: [u8; CONF_VALUE_CAPACITY],
}

impl Default for ConfBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfBuf {
    pub fn new() -> Self {
        Self {
            bytes: [0u8; CONF_VALUE_CAPACITY],
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Decodes the value up to its terminator.
    pub fn to_value(&self, key: &str) -> Result<String, Error> {
        let end = self.bytes.iter().position(|b| *b == 0).ok_or_else(|| {
            Error::new(ErrorKind::Configuration)
                .with_message("config value exceeds buffer capacity")
                .with_key(key)
        })?;
        String::from_utf8(self.bytes[..end].to_vec()).map_err(|err| {
            Error::new(ErrorKind::Configuration)
                .with_message("config value is not valid UTF-8")
                .with_key(key)
                .with_source(err)
        })
    }
}

/// A reusable connection profile.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterOptions {
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conf_file: Option<PathBuf>,
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

fn default_cluster_name() -> String {
    DEFAULT_CLUSTER_NAME.to_string()
}

impl ClusterOptions {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            cluster_name: default_cluster_name(),
            client_name: client_name.into(),
            conf_file: None,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_conf_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.conf_file = Some(path.into());
        self
    }

    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            Error::new(ErrorKind::Configuration)
                .with_message("failed to read options file")
                .with_path(path)
                .with_source(err)
        })?;
        Self::from_json_str(&text).map_err(|err| err.with_path(path))
    }

    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|err| {
            Error::new(ErrorKind::Configuration)
                .with_message("invalid options json")
                .with_source(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CONF_VALUE_CAPACITY, ClusterOptions, ConfBuf};
    use crate::core::error::ErrorKind;

    #[test]
    fn unterminated_buffer_is_an_error() {
        let mut buf = ConfBuf::new();
        buf.as_mut_slice().fill(b'a');
        let err = buf.to_value("mon_host").expect_err("no terminator");
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.key(), Some("mon_host"));
    }

    #[test]
    fn value_stops_at_terminator() {
        let mut buf = ConfBuf::new();
        let slice = buf.as_mut_slice();
        slice[..3].copy_from_slice(b"abc");
        slice[3] = 0;
        slice[4..7].copy_from_slice(b"zzz");
        assert_eq!(buf.to_value("k").expect("value"), "abc");
        assert_eq!(CONF_VALUE_CAPACITY, 1024);
    }

    #[test]
    fn options_default_cluster_and_overrides() {
        let options = ClusterOptions::from_json_str(r#"{"client_name": "admin"}"#).expect("parse");
        assert_eq!(options, ClusterOptions::new("admin"));
        assert_eq!(options.cluster_name, "ceph");
        assert!(options.overrides.is_empty());
    }

    #[test]
    fn options_reject_unknown_fields() {
        let err = ClusterOptions::from_json_str(r#"{"client_name": "admin", "mon": "x"}"#)
            .expect_err("unknown field");
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn options_file_errors_carry_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("missing.json");
        let err = ClusterOptions::from_json_file(&path).expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.path(), Some(path.as_path()));
    }
}
