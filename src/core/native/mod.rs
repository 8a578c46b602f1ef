//! Purpose: Narrow capability surface over the native cluster client library.
//! Exports: `Driver`, `Librados`, `RawCluster`, `RawIoctx`, `MemoryCluster` and its handle types.
//! Role: The only place the handle layer reaches native code through.
//! Invariants: Every fallible call returns the native negative errno on failure.
//! Invariants: Raw FFI interaction is confined to this module + `sys`.
//! Invariants: Without the `librados` feature the driver is unlinked and
//! `create` fails with `-ENOSYS`; no handle can exist, so the rest is unreachable.
use std::ffi::CStr;
use std::os::raw::c_void;

use crate::core::version::Version;

mod memory;
#[cfg(feature = "librados")]
pub mod sys;

pub use memory::{MemoryCluster, MemoryConn, MemoryIoctx};

/// Result of a native call: the value, or the negative errno it reported.
pub type NativeResult<T> = Result<T, i32>;

/// Capability interface of the native client library.
///
/// Handles own the associated `Cluster`/`Ioctx` values; a driver never keeps
/// references to them. `shutdown` and `ioctx_destroy` consume their argument,
/// so a value cannot be released twice through the same handle.
pub trait Driver: Clone {
    type Cluster;
    type Ioctx;

    fn version(&self) -> Version;

    /// `entity_name` is the full `type.id` name (e.g. `client.admin`).
    fn create(&self, cluster_name: &CStr, entity_name: &CStr) -> NativeResult<Self::Cluster>;

    fn connect(&self, cluster: &mut Self::Cluster) -> NativeResult<()>;

    fn shutdown(&self, cluster: Self::Cluster);

    fn conf_set(&self, cluster: &mut Self::Cluster, key: &CStr, value: &CStr) -> NativeResult<()>;

    /// Writes a NUL-terminated value into `buf`.
    ///
    /// Fails with `-ENAMETOOLONG` when the value and its terminator do not fit.
    fn conf_get(&self, cluster: &Self::Cluster, key: &CStr, buf: &mut [u8]) -> NativeResult<()>;

    fn conf_read_file(&self, cluster: &mut Self::Cluster, path: &CStr) -> NativeResult<()>;

    fn ioctx_create(&self, cluster: &Self::Cluster, pool_name: &CStr) -> NativeResult<Self::Ioctx>;

    fn ioctx_destroy(&self, ioctx: Self::Ioctx);

    fn ioctx_pool_id(&self, ioctx: &Self::Ioctx) -> i64;
}

/// Driver backed by the system librados.
#[derive(Clone, Copy, Debug, Default)]
pub struct Librados;

/// Owned `rados_t`.
#[derive(Debug)]
#[cfg_attr(not(feature = "librados"), allow(dead_code))]
pub struct RawCluster(*mut c_void);

/// Owned `rados_ioctx_t`.
#[derive(Debug)]
#[cfg_attr(not(feature = "librados"), allow(dead_code))]
pub struct RawIoctx(*mut c_void);

// Safety: librados handles may be used from any thread as long as calls are
// not concurrent; neither type is `Sync`, so sharing needs external locking.
unsafe impl Send for RawCluster {}
unsafe impl Send for RawIoctx {}

#[cfg(feature = "librados")]
impl Driver for Librados {
    type Cluster = RawCluster;
    type Ioctx = RawIoctx;

    fn version(&self) -> Version {
        let (mut major, mut minor, mut extra) = (0, 0, 0);
        unsafe { sys::rados_version(&mut major, &mut minor, &mut extra) };
        Version::new(major, minor, extra)
    }

    fn create(&self, cluster_name: &CStr, entity_name: &CStr) -> NativeResult<RawCluster> {
        let mut raw: sys::rados_t = std::ptr::null_mut();
        let ret = unsafe {
            sys::rados_create2(&mut raw, cluster_name.as_ptr(), entity_name.as_ptr(), 0)
        };
        if ret < 0 {
            return Err(ret);
        }
        if raw.is_null() {
            return Err(-libc::ENOMEM);
        }
        Ok(RawCluster(raw))
    }

    fn connect(&self, cluster: &mut RawCluster) -> NativeResult<()> {
        check(unsafe { sys::rados_connect(cluster.0) })
    }

    fn shutdown(&self, cluster: RawCluster) {
        unsafe { sys::rados_shutdown(cluster.0) };
    }

    fn conf_set(&self, cluster: &mut RawCluster, key: &CStr, value: &CStr) -> NativeResult<()> {
        check(unsafe { sys::rados_conf_set(cluster.0, key.as_ptr(), value.as_ptr()) })
    }

    fn conf_get(&self, cluster: &RawCluster, key: &CStr, buf: &mut [u8]) -> NativeResult<()> {
        check(unsafe {
            sys::rados_conf_get(
                cluster.0,
                key.as_ptr(),
                buf.as_mut_ptr() as *mut std::os::raw::c_char,
                buf.len(),
            )
        })
    }

    fn conf_read_file(&self, cluster: &mut RawCluster, path: &CStr) -> NativeResult<()> {
        check(unsafe { sys::rados_conf_read_file(cluster.0, path.as_ptr()) })
    }

    fn ioctx_create(&self, cluster: &RawCluster, pool_name: &CStr) -> NativeResult<RawIoctx> {
        let mut raw: sys::rados_ioctx_t = std::ptr::null_mut();
        let ret = unsafe { sys::rados_ioctx_create(cluster.0, pool_name.as_ptr(), &mut raw) };
        if ret < 0 {
            return Err(ret);
        }
        if raw.is_null() {
            return Err(-libc::ENOMEM);
        }
        Ok(RawIoctx(raw))
    }

    fn ioctx_destroy(&self, ioctx: RawIoctx) {
        unsafe { sys::rados_ioctx_destroy(ioctx.0) };
    }

    fn ioctx_pool_id(&self, ioctx: &RawIoctx) -> i64 {
        unsafe { sys::rados_ioctx_get_id(ioctx.0) }
    }
}

#[cfg(feature = "librados")]
fn check(ret: std::os::raw::c_int) -> NativeResult<()> {
    if ret < 0 { Err(ret) } else { Ok(()) }
}

#[cfg(not(feature = "librados"))]
impl Driver for Librados {
    type Cluster = RawCluster;
    type Ioctx = RawIoctx;

    fn version(&self) -> Version {
        Version::new(0, 0, 0)
    }

    fn create(&self, _cluster_name: &CStr, _entity_name: &CStr) -> NativeResult<RawCluster> {
        Err(-libc::ENOSYS)
    }

    fn connect(&self, _cluster: &mut RawCluster) -> NativeResult<()> {
        Err(-libc::ENOSYS)
    }

    fn shutdown(&self, _cluster: RawCluster) {}

    fn conf_set(&self, _cluster: &mut RawCluster, _key: &CStr, _value: &CStr) -> NativeResult<()> {
        Err(-libc::ENOSYS)
    }

    fn conf_get(&self, _cluster: &RawCluster, _key: &CStr, _buf: &mut [u8]) -> NativeResult<()> {
        Err(-libc::ENOSYS)
    }

    fn conf_read_file(&self, _cluster: &mut RawCluster, _path: &CStr) -> NativeResult<()> {
        Err(-libc::ENOSYS)
    }

    fn ioctx_create(&self, _cluster: &RawCluster, _pool_name: &CStr) -> NativeResult<RawIoctx> {
        Err(-libc::ENOSYS)
    }

    fn ioctx_destroy(&self, _ioctx: RawIoctx) {}

    fn ioctx_pool_id(&self, _ioctx: &RawIoctx) -> i64 {
        -1
    }
}

#[cfg(all(test, not(feature = "librados")))]
mod tests {
    use super::{Driver, Librados};

    #[test]
    fn unlinked_driver_refuses_to_create() {
        let code = Librados
            .create(c"ceph", c"client.admin")
            .expect_err("unlinked create must fail");
        assert_eq!(code, -libc::ENOSYS);
        assert_eq!(Librados.version().as_tuple(), (0, 0, 0));
    }
}
