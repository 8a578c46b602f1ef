// Pool (I/O context) handle opened from a connected cluster handle.
use tracing::debug;

use crate::core::error::{Error, ErrorKind};
use crate::core::native::{Driver, Librados};

/// An I/O context scoped to one named pool.
///
/// Holds no reference to the `ClusterHandle` it came from. The cluster must
/// stay connected while this handle is active; that ordering is on the caller.
pub struct PoolHandle<D: Driver = Librados> {
    driver: D,
    raw: Option<D::Ioctx>,
    name: String,
}

impl<D: Driver> PoolHandle<D> {
    pub(crate) fn new(driver: D, raw: D::Ioctx, name: &str) -> Self {
        Self {
            driver,
            raw: Some(raw),
            name: name.to_string(),
        }
    }

    /// Name given at open time; valid after close.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.raw.is_some()
    }

    /// Cluster-assigned numeric pool id.
    pub fn id(&self) -> Result<i64, Error> {
        let raw = self.raw.as_ref().ok_or_else(|| {
            Error::new(ErrorKind::InvalidHandle)
                .with_message("pool handle is closed")
                .with_pool(&self.name)
        })?;
        Ok(self.driver.ioctx_pool_id(raw))
    }

    /// Releases the I/O context. Never fails; later calls are no-ops.
    pub fn close(&mut self) {
        if let Some(raw) = self.raw.take() {
            self.driver.ioctx_destroy(raw);
            debug!(pool = %self.name, "pool handle closed");
        }
    }
}

impl<D: Driver> Drop for PoolHandle<D> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<D: Driver> std::fmt::Debug for PoolHandle<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolHandle")
            .field("name", &self.name)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::core::cluster::ClusterHandle;
    use crate::core::error::ErrorKind;
    use crate::core::native::MemoryCluster;

    fn connected(cluster: &MemoryCluster) -> ClusterHandle<MemoryCluster> {
        let mut handle = ClusterHandle::create_with(cluster.clone(), "admin").expect("create");
        handle.config_set("mon_host", "10.0.0.1").expect("set");
        handle.connect().expect("connect");
        handle
    }

    #[test]
    fn id_and_name_while_active() {
        let cluster = MemoryCluster::new().with_pool_id("rbd", 7);
        let handle = connected(&cluster);
        let pool = handle.open_pool("rbd").expect("open");
        assert!(pool.is_active());
        assert_eq!(pool.id().expect("id"), 7);
        assert_eq!(pool.name(), "rbd");
    }

    #[test]
    fn close_is_idempotent_and_guards_id() {
        let cluster = MemoryCluster::new().with_pool("rbd");
        let handle = connected(&cluster);
        let mut pool = handle.open_pool("rbd").expect("open");
        assert_eq!(cluster.live_ioctxs(), 1);

        pool.close();
        pool.close();
        assert_eq!(cluster.live_ioctxs(), 0);
        assert!(!pool.is_active());
        let err = pool.id().expect_err("closed");
        assert_eq!(err.kind(), ErrorKind::InvalidHandle);
        assert_eq!(err.pool(), Some("rbd"));
        assert_eq!(pool.name(), "rbd");
    }

    #[test]
    fn drop_releases_ioctx() {
        let cluster = MemoryCluster::new().with_pool("rbd");
        let handle = connected(&cluster);
        {
            let _pool = handle.open_pool("rbd").expect("open");
            assert_eq!(cluster.live_ioctxs(), 1);
        }
        assert_eq!(cluster.live_ioctxs(), 0);
    }

    #[test]
    fn missing_pool_is_pool_open_error() {
        let cluster = MemoryCluster::new();
        let handle = connected(&cluster);
        let err = handle.open_pool("nope").expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::PoolOpen);
        assert_eq!(err.errno(), Some(-libc::ENOENT));
        assert_eq!(err.pool(), Some("nope"));
    }
}
