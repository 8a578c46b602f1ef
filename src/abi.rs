//! Purpose: C ABI bridge for host-language bindings (libradosbind).
//! Exports: C-callable cluster/pool lifecycle functions and string/error helpers.
//! Role: Stable ABI surface for non-Rust bindings in v0.
//! Invariants: Opaque handles; `0` on success, `-1` on failure with `*out_err` set.
//! Invariants: `*_close` releases the native resource but keeps the wrapper, so later
//! calls fail with `InvalidHandle`; `*_free` closes and deallocates.
//! Invariants: Error kind codes equal `to_exit_code` for the same kind.
//! Notes: Strings returned through out-pointers must be released with `rb_string_free`.
#![allow(non_camel_case_types)]
#![allow(clippy::not_unsafe_ptr_arg_deref)]

use crate::core::cluster::ClusterHandle;
use crate::core::error::{Error, ErrorKind, to_exit_code};
use crate::core::native::Librados;
use crate::core::pool::PoolHandle;
use crate::core::version::version;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;

const BINDING_VERSION_C: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

#[repr(C)]
pub struct rb_cluster {
    handle: ClusterHandle<Librados>,
}

#[repr(C)]
pub struct rb_pool {
    handle: PoolHandle<Librados>,
}

#[repr(C)]
pub struct rb_error {
    pub kind: i32,
    pub errno: i32,
    pub has_errno: u8,
    pub message: *mut c_char,
    pub path: *mut c_char,
}

#[unsafe(no_mangle)]
pub extern "C" fn rb_version(out_major: *mut c_int, out_minor: *mut c_int, out_extra: *mut c_int) {
    let (major, minor, extra) = version().as_tuple();
    for (out, value) in [(out_major, major), (out_minor, minor), (out_extra, extra)] {
        if !out.is_null() {
            unsafe {
                *out = value;
            }
        }
    }
}

/// Static, NUL-terminated; never free it.
#[unsafe(no_mangle)]
pub extern "C" fn rb_binding_version() -> *const c_char {
    BINDING_VERSION_C.as_ptr() as *const c_char
}

#[unsafe(no_mangle)]
pub extern "C" fn rb_cluster_create(
    client_name: *const c_char,
    out_cluster: *mut *mut rb_cluster,
    out_err: *mut *mut rb_error,
) -> i32 {
    if out_cluster.is_null() {
        return fail(
            out_err,
            Error::new(ErrorKind::Usage).with_message("out_cluster is null"),
        );
    }
    let client_name = match parse_str(client_name, "client_name") {
        Ok(name) => name,
        Err(err) => return fail(out_err, err),
    };
    let handle = match ClusterHandle::create(client_name) {
        Ok(handle) => handle,
        Err(err) => return fail(out_err, err),
    };
    let cluster = Box::new(rb_cluster { handle });
    unsafe {
        *out_cluster = Box::into_raw(cluster);
    }
    0
}

#[unsafe(no_mangle)]
pub extern "C" fn rb_cluster_connect(cluster: *mut rb_cluster, out_err: *mut *mut rb_error) -> i32 {
    let cluster = match borrow_cluster(cluster, out_err) {
        Ok(cluster) => cluster,
        Err(code) => return code,
    };
    match cluster.handle.connect() {
        Ok(()) => 0,
        Err(err) => fail(out_err, err),
    }
}

/// Returns `1` when connected, `0` otherwise (including a null handle).
#[unsafe(no_mangle)]
pub extern "C" fn rb_cluster_is_connected(cluster: *const rb_cluster) -> i32 {
    if cluster.is_null() {
        return 0;
    }
    let cluster = unsafe { &*cluster };
    if cluster.handle.is_connected() { 1 } else { 0 }
}

#[unsafe(no_mangle)]
pub extern "C" fn rb_cluster_conf_set(
    cluster: *mut rb_cluster,
    key: *const c_char,
    value: *const c_char,
    out_err: *mut *mut rb_error,
) -> i32 {
    let cluster = match borrow_cluster(cluster, out_err) {
        Ok(cluster) => cluster,
        Err(code) => return code,
    };
    let (key, value) = match (parse_str(key, "key"), parse_str(value, "value")) {
        (Ok(key), Ok(value)) => (key, value),
        (Err(err), _) | (_, Err(err)) => return fail(out_err, err),
    };
    match cluster.handle.config_set(key, value) {
        Ok(()) => 0,
        Err(err) => fail(out_err, err),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn rb_cluster_conf_get(
    cluster: *mut rb_cluster,
    key: *const c_char,
    out_value: *mut *mut c_char,
    out_err: *mut *mut rb_error,
) -> i32 {
    let cluster = match borrow_cluster(cluster, out_err) {
        Ok(cluster) => cluster,
        Err(code) => return code,
    };
    if out_value.is_null() {
        return fail(
            out_err,
            Error::new(ErrorKind::Usage).with_message("out_value is null"),
        );
    }
    let key = match parse_str(key, "key") {
        Ok(key) => key,
        Err(err) => return fail(out_err, err),
    };
    let value = match cluster.handle.config_get(key) {
        Ok(value) => value,
        Err(err) => return fail(out_err, err),
    };
    unsafe {
        *out_value = to_c_string(&value);
    }
    0
}

#[unsafe(no_mangle)]
pub extern "C" fn rb_cluster_conf_read_file(
    cluster: *mut rb_cluster,
    path: *const c_char,
    out_err: *mut *mut rb_error,
) -> i32 {
    let cluster = match borrow_cluster(cluster, out_err) {
        Ok(cluster) => cluster,
        Err(code) => return code,
    };
    let path = match parse_str(path, "path") {
        Ok(path) => path,
        Err(err) => return fail(out_err, err),
    };
    match cluster.handle.config_read_file(path) {
        Ok(()) => 0,
        Err(err) => fail(out_err, err),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn rb_cluster_close(cluster: *mut rb_cluster) {
    if cluster.is_null() {
        return;
    }
    unsafe {
        (*cluster).handle.close();
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn rb_cluster_free(cluster: *mut rb_cluster) {
    if cluster.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(cluster));
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn rb_pool_open(
    cluster: *mut rb_cluster,
    pool_name: *const c_char,
    out_pool: *mut *mut rb_pool,
    out_err: *mut *mut rb_error,
) -> i32 {
    let cluster = match borrow_cluster(cluster, out_err) {
        Ok(cluster) => cluster,
        Err(code) => return code,
    };
    if out_pool.is_null() {
        return fail(
            out_err,
            Error::new(ErrorKind::Usage).with_message("out_pool is null"),
        );
    }
    let pool_name = match parse_str(pool_name, "pool_name") {
        Ok(name) => name,
        Err(err) => return fail(out_err, err),
    };
    let handle = match cluster.handle.open_pool(pool_name) {
        Ok(handle) => handle,
        Err(err) => return fail(out_err, err),
    };
    let pool = Box::new(rb_pool { handle });
    unsafe {
        *out_pool = Box::into_raw(pool);
    }
    0
}

#[unsafe(no_mangle)]
pub extern "C" fn rb_pool_id(
    pool: *mut rb_pool,
    out_id: *mut i64,
    out_err: *mut *mut rb_error,
) -> i32 {
    let pool = match borrow_pool(pool, out_err) {
        Ok(pool) => pool,
        Err(code) => return code,
    };
    if out_id.is_null() {
        return fail(
            out_err,
            Error::new(ErrorKind::Usage).with_message("out_id is null"),
        );
    }
    match pool.handle.id() {
        Ok(id) => {
            unsafe {
                *out_id = id;
            }
            0
        }
        Err(err) => fail(out_err, err),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn rb_pool_name(
    pool: *mut rb_pool,
    out_name: *mut *mut c_char,
    out_err: *mut *mut rb_error,
) -> i32 {
    let pool = match borrow_pool(pool, out_err) {
        Ok(pool) => pool,
        Err(code) => return code,
    };
    if out_name.is_null() {
        return fail(
            out_err,
            Error::new(ErrorKind::Usage).with_message("out_name is null"),
        );
    }
    unsafe {
        *out_name = to_c_string(pool.handle.name());
    }
    0
}

#[unsafe(no_mangle)]
pub extern "C" fn rb_pool_close(pool: *mut rb_pool) {
    if pool.is_null() {
        return;
    }
    unsafe {
        (*pool).handle.close();
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn rb_pool_free(pool: *mut rb_pool) {
    if pool.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(pool));
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn rb_string_free(value: *mut c_char) {
    if value.is_null() {
        return;
    }
    unsafe {
        drop(CString::from_raw(value));
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn rb_error_free(err: *mut rb_error) {
    if err.is_null() {
        return;
    }
    unsafe {
        let err = Box::from_raw(err);
        if !err.message.is_null() {
            drop(CString::from_raw(err.message));
        }
        if !err.path.is_null() {
            drop(CString::from_raw(err.path));
        }
    }
}

fn borrow_cluster<'a>(
    cluster: *mut rb_cluster,
    out_err: *mut *mut rb_error,
) -> Result<&'a mut rb_cluster, i32> {
    if cluster.is_null() {
        return Err(fail(
            out_err,
            Error::new(ErrorKind::Usage).with_message("cluster is null"),
        ));
    }
    unsafe { Ok(&mut *cluster) }
}

fn borrow_pool<'a>(pool: *mut rb_pool, out_err: *mut *mut rb_error) -> Result<&'a mut rb_pool, i32> {
    if pool.is_null() {
        return Err(fail(
            out_err,
            Error::new(ErrorKind::Usage).with_message("pool is null"),
        ));
    }
    unsafe { Ok(&mut *pool) }
}

fn parse_str<'a>(input: *const c_char, name: &str) -> Result<&'a str, Error> {
    if input.is_null() {
        return Err(Error::new(ErrorKind::Usage).with_message(format!("{name} is null")));
    }
    unsafe { CStr::from_ptr(input) }
        .to_str()
        .map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("{name} is not valid UTF-8"))
                .with_source(err)
        })
}

fn fail(out_err: *mut *mut rb_error, err: Error) -> i32 {
    if out_err.is_null() {
        return -1;
    }
    let message = match (err.message(), err.key(), err.pool()) {
        (Some(message), Some(key), _) => format!("{message} (key: {key})"),
        (Some(message), None, Some(pool)) => format!("{message} (pool: {pool})"),
        (Some(message), None, None) => message.to_string(),
        (None, _, _) => String::new(),
    };
    let error = Box::new(rb_error {
        kind: to_exit_code(err.kind()),
        errno: err.errno().unwrap_or(0),
        has_errno: if err.errno().is_some() { 1 } else { 0 },
        message: to_c_string(&message),
        path: err
            .path()
            .map(|path| to_c_string(path.to_string_lossy().as_ref()))
            .unwrap_or(ptr::null_mut()),
    });
    unsafe {
        *out_err = Box::into_raw(error);
    }
    -1
}

fn to_c_string(input: &str) -> *mut c_char {
    CString::new(input)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}
