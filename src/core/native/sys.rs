// Raw FFI bindings to librados (`rados/librados.h`).
#![allow(non_camel_case_types)]
use std::os::raw::{c_char, c_int, c_void};

pub type rados_t = *mut c_void;
pub type rados_ioctx_t = *mut c_void;

unsafe extern "C" {
    pub fn rados_version(major: *mut c_int, minor: *mut c_int, extra: *mut c_int);

    pub fn rados_create2(
        pcluster: *mut rados_t,
        clustername: *const c_char,
        name: *const c_char,
        flags: u64,
    ) -> c_int;

    pub fn rados_connect(cluster: rados_t) -> c_int;

    pub fn rados_shutdown(cluster: rados_t);

    pub fn rados_conf_set(cluster: rados_t, option: *const c_char, value: *const c_char) -> c_int;

    pub fn rados_conf_get(
        cluster: rados_t,
        option: *const c_char,
        buf: *mut c_char,
        len: usize,
    ) -> c_int;

    pub fn rados_conf_read_file(cluster: rados_t, path: *const c_char) -> c_int;

    pub fn rados_ioctx_create(
        cluster: rados_t,
        pool_name: *const c_char,
        ioctx: *mut rados_ioctx_t,
    ) -> c_int;

    pub fn rados_ioctx_destroy(io: rados_ioctx_t);

    pub fn rados_ioctx_get_id(io: rados_ioctx_t) -> i64;
}
