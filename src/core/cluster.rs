//! Purpose: Cluster connection handle: create, configure, connect, shut down.
//! Exports: `ClusterHandle`, `ClusterState`.
//! Role: Exclusive owner of one native connection reference.
//! Invariants: The native reference is created once and never exposed or duplicated.
//! Invariants: `Closed` is terminal; every later fallible call is `InvalidHandle`.
//! Invariants: Native shutdown runs at most once per handle (explicit close or drop).
//! Notes: Double `connect` is forwarded to the library, which decides the outcome.
//! Notes: Pool handles do not keep their cluster alive; closing the cluster while
//! pools are open is the caller's responsibility.
use std::ffi::CString;
use std::path::Path;

use tracing::{debug, warn};

use crate::core::conf::{ClusterOptions, ConfBuf, DEFAULT_CLUSTER_NAME};
use crate::core::error::{Error, ErrorKind};
use crate::core::native::{Driver, Librados};
use crate::core::pool::PoolHandle;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClusterState {
    Created,
    Connected,
    Closed,
}

/// A connection to a storage cluster.
///
/// Not `Sync`: callers must serialize access to a single handle.
pub struct ClusterHandle<D: Driver = Librados> {
    driver: D,
    raw: Option<D::Cluster>,
    state: ClusterState,
    cluster_name: String,
    entity_name: String,
}

impl ClusterHandle<Librados> {
    /// Creates an unconnected handle for `client_name` on the `ceph` cluster.
    pub fn create(client_name: &str) -> Result<Self, Error> {
        Self::create_with(Librados, client_name)
    }
}

impl<D: Driver> ClusterHandle<D> {
    pub fn create_with(driver: D, client_name: &str) -> Result<Self, Error> {
        Self::create_named(driver, DEFAULT_CLUSTER_NAME, client_name)
    }

    pub fn create_named(driver: D, cluster_name: &str, client_name: &str) -> Result<Self, Error> {
        let entity_name = entity_name(client_name);
        let c_cluster = c_string(cluster_name, ErrorKind::Initialization, "cluster name")?;
        let c_entity = c_string(&entity_name, ErrorKind::Initialization, "client name")?;

        let raw = driver.create(&c_cluster, &c_entity).map_err(|code| {
            warn!(client = %entity_name, errno = code, "cluster handle creation failed");
            Error::native(ErrorKind::Initialization, code)
                .with_message("failed to create cluster handle")
        })?;
        debug!(cluster = cluster_name, client = %entity_name, "cluster handle created");

        Ok(Self {
            driver,
            raw: Some(raw),
            state: ClusterState::Created,
            cluster_name: cluster_name.to_string(),
            entity_name,
        })
    }

    /// Creates a handle and applies a profile: config file first, then overrides.
    ///
    /// The returned handle is not connected. On failure the partially
    /// configured handle is released before the error is returned.
    pub fn from_options(driver: D, options: &ClusterOptions) -> Result<Self, Error> {
        let mut handle = Self::create_named(driver, &options.cluster_name, &options.client_name)?;
        if let Some(path) = &options.conf_file {
            handle.config_read_file(path)?;
        }
        for (key, value) in &options.overrides {
            handle.config_set(key, value)?;
        }
        Ok(handle)
    }

    pub fn state(&self) -> ClusterState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ClusterState::Connected
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Full `type.id` name the handle authenticates as.
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// The id part of the entity name (`admin` for `client.admin`).
    pub fn client_name(&self) -> &str {
        self.entity_name
            .split_once('.')
            .map(|(_, id)| id)
            .unwrap_or(&self.entity_name)
    }

    pub fn connect(&mut self) -> Result<(), Error> {
        let raw = self.raw.as_mut().ok_or_else(|| closed_error("connect"))?;
        if let Err(code) = self.driver.connect(raw) {
            warn!(client = %self.entity_name, errno = code, "cluster connect failed");
            return Err(Error::native(ErrorKind::Connection, code)
                .with_message("failed to connect to cluster"));
        }
        self.state = ClusterState::Connected;
        debug!(client = %self.entity_name, "cluster connected");
        Ok(())
    }

    pub fn config_set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        let raw = self.raw.as_mut().ok_or_else(|| closed_error("config_set"))?;
        let c_key = c_string(key, ErrorKind::Configuration, "config key")?;
        let c_value = c_string(value, ErrorKind::Configuration, "config value")
            .map_err(|err| err.with_key(key))?;
        self.driver.conf_set(raw, &c_key, &c_value).map_err(|code| {
            Error::native(ErrorKind::Configuration, code)
                .with_message("failed to set config value")
                .with_key(key)
        })
    }

    pub fn config_get(&self, key: &str) -> Result<String, Error> {
        let raw = self.raw.as_ref().ok_or_else(|| closed_error("config_get"))?;
        let c_key = c_string(key, ErrorKind::Configuration, "config key")?;
        let mut buf = ConfBuf::new();
        self.driver
            .conf_get(raw, &c_key, buf.as_mut_slice())
            .map_err(|code| {
                let message = if code == -libc::ENAMETOOLONG {
                    "config value exceeds buffer capacity"
                } else {
                    "failed to read config value"
                };
                Error::native(ErrorKind::Configuration, code)
                    .with_message(message)
                    .with_key(key)
            })?;
        buf.to_value(key)
    }

    pub fn config_read_file(&mut self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let raw = self
            .raw
            .as_mut()
            .ok_or_else(|| closed_error("config_read_file"))?;
        let text = path.to_str().ok_or_else(|| {
            Error::new(ErrorKind::Configuration)
                .with_message("config path is not valid UTF-8")
                .with_path(path)
        })?;
        let c_path = c_string(text, ErrorKind::Configuration, "config path")
            .map_err(|err| err.with_path(path))?;
        self.driver.conf_read_file(raw, &c_path).map_err(|code| {
            Error::native(ErrorKind::Configuration, code)
                .with_message("failed to read config file")
                .with_path(path)
        })?;
        debug!(client = %self.entity_name, path = %path.display(), "config file loaded");
        Ok(())
    }

    /// Opens an I/O context for `name`. The cluster must be connected.
    pub fn open_pool(&self, name: &str) -> Result<PoolHandle<D>, Error> {
        let raw = self.raw.as_ref().ok_or_else(|| closed_error("open_pool"))?;
        let c_name = c_string(name, ErrorKind::PoolOpen, "pool name")
            .map_err(|err| err.with_pool(name))?;
        let ioctx = self.driver.ioctx_create(raw, &c_name).map_err(|code| {
            warn!(client = %self.entity_name, pool = name, errno = code, "pool open failed");
            Error::native(ErrorKind::PoolOpen, code)
                .with_message("failed to open pool")
                .with_pool(name)
        })?;
        debug!(client = %self.entity_name, pool = name, "pool opened");
        Ok(PoolHandle::new(self.driver.clone(), ioctx, name))
    }

    /// Shuts the connection down. Never fails; later calls are no-ops.
    pub fn close(&mut self) {
        if let Some(raw) = self.raw.take() {
            self.driver.shutdown(raw);
            debug!(client = %self.entity_name, "cluster handle closed");
        }
        self.state = ClusterState::Closed;
    }
}

impl<D: Driver> Drop for ClusterHandle<D> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<D: Driver> std::fmt::Debug for ClusterHandle<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterHandle")
            .field("cluster_name", &self.cluster_name)
            .field("entity_name", &self.entity_name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn entity_name(client_name: &str) -> String {
    if client_name.contains('.') {
        client_name.to_string()
    } else {
        format!("client.{client_name}")
    }
}

fn c_string(value: &str, kind: ErrorKind, what: &str) -> Result<CString, Error> {
    CString::new(value).map_err(|err| {
        Error::new(kind)
            .with_message(format!("{what} contains NUL"))
            .with_source(err)
    })
}

fn closed_error(op: &str) -> Error {
    Error::new(ErrorKind::InvalidHandle).with_message(format!("{op} on a closed cluster handle"))
}

#[cfg(test)]
mod tests {
    use super::{ClusterHandle, ClusterState, entity_name};
    use crate::core::conf::ClusterOptions;
    use crate::core::error::ErrorKind;
    use crate::core::native::MemoryCluster;

    fn handle(cluster: &MemoryCluster) -> ClusterHandle<MemoryCluster> {
        ClusterHandle::create_with(cluster.clone(), "admin").expect("create")
    }

    #[test]
    fn entity_names_get_client_prefix() {
        assert_eq!(entity_name("admin"), "client.admin");
        assert_eq!(entity_name("client.rgw"), "client.rgw");
        assert_eq!(entity_name("osd.0"), "osd.0");
    }

    #[test]
    fn lifecycle_moves_through_states() {
        let cluster = MemoryCluster::new();
        let mut handle = handle(&cluster);
        assert_eq!(handle.state(), ClusterState::Created);
        assert_eq!(handle.client_name(), "admin");
        assert_eq!(handle.entity_name(), "client.admin");
        assert_eq!(handle.cluster_name(), "ceph");

        handle.config_set("mon_host", "10.0.0.1").expect("set");
        handle.connect().expect("connect");
        assert_eq!(handle.state(), ClusterState::Connected);
        assert!(handle.is_connected());

        handle.close();
        assert_eq!(handle.state(), ClusterState::Closed);
        assert!(!handle.is_connected());
        assert_eq!(cluster.live_connections(), 0);
    }

    #[test]
    fn closed_handle_rejects_everything() {
        let cluster = MemoryCluster::new().with_pool("rbd");
        let mut handle = handle(&cluster);
        handle.close();
        handle.close();

        assert_eq!(
            handle.connect().expect_err("connect").kind(),
            ErrorKind::InvalidHandle
        );
        assert_eq!(
            handle.config_set("mon_host", "x").expect_err("set").kind(),
            ErrorKind::InvalidHandle
        );
        assert_eq!(
            handle.config_get("mon_host").expect_err("get").kind(),
            ErrorKind::InvalidHandle
        );
        assert_eq!(
            handle.config_read_file("/nope").expect_err("read").kind(),
            ErrorKind::InvalidHandle
        );
        assert_eq!(
            handle.open_pool("rbd").expect_err("open").kind(),
            ErrorKind::InvalidHandle
        );
    }

    #[test]
    fn double_connect_is_left_to_the_library() {
        let cluster = MemoryCluster::new();
        let mut handle = handle(&cluster);
        handle.config_set("mon_host", "10.0.0.1").expect("set");
        handle.connect().expect("connect");
        let err = handle.connect().expect_err("second connect");
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert_eq!(err.errno(), Some(-libc::EISCONN));
        assert!(handle.is_connected());
    }

    #[test]
    fn nul_bytes_map_to_operation_kind() {
        let cluster = MemoryCluster::new();
        let err = ClusterHandle::create_with(cluster.clone(), "ad\0min").expect_err("nul");
        assert_eq!(err.kind(), ErrorKind::Initialization);

        let mut handle = handle(&cluster);
        let err = handle.config_set("mon_host", "a\0b").expect_err("nul value");
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.key(), Some("mon_host"));

        let err = handle.open_pool("r\0bd").expect_err("nul pool");
        assert_eq!(err.kind(), ErrorKind::PoolOpen);
    }

    #[test]
    fn rejected_entity_fails_creation() {
        let cluster = MemoryCluster::new().reject_entity("client.banned");
        let err = ClusterHandle::create_with(cluster.clone(), "banned").expect_err("reject");
        assert_eq!(err.kind(), ErrorKind::Initialization);
        assert_eq!(err.errno(), Some(-libc::EINVAL));
        assert_eq!(cluster.live_connections(), 0);
    }

    #[test]
    fn from_options_releases_handle_on_failure() {
        let cluster = MemoryCluster::new();
        let options = ClusterOptions::new("admin")
            .with_override("mon_host", "10.0.0.1")
            .with_override("not_a_real_option", "1");
        let err = ClusterHandle::from_options(cluster.clone(), &options).expect_err("bad key");
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.key(), Some("not_a_real_option"));
        assert_eq!(cluster.live_connections(), 0);
    }

    #[test]
    fn from_options_applies_overrides_unconnected() {
        let cluster = MemoryCluster::new();
        let options = ClusterOptions::new("rgw").with_override("mon_host", "10.0.0.9");
        let handle = ClusterHandle::from_options(cluster.clone(), &options).expect("options");
        assert_eq!(handle.state(), ClusterState::Created);
        assert_eq!(handle.config_get("mon_host").expect("get"), "10.0.0.9");
        assert_eq!(handle.config_get("name").expect("name"), "client.rgw");
    }
}
