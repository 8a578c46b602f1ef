/*
Purpose: Provide a Node N-API binding over the libradosbind C ABI.
Key Exports: Cluster, Pool, version, bindingVersion, ErrorKind.
Role: Node/TypeScript binding mirroring the Rust handle lifecycle.
Invariants: Calls into C ABI only; explicit close methods; close on drop.
Invariants: Errors include stable kinds and context in message text.
Notes: Closing a Cluster while its Pools are open is the caller's responsibility.
*/

use libc::{c_char, c_int};
use napi::bindgen_prelude::{BigInt, Status};
use napi::{Error, Result};
use napi_derive::napi;
use std::ffi::{CStr, CString};
use std::ptr;

#[repr(C)]
struct rb_cluster_t {
    _private: [u8; 0],
}

#[repr(C)]
struct rb_pool_t {
    _private: [u8; 0],
}

#[repr(C)]
struct rb_error_t {
    kind: i32,
    errno: i32,
    has_errno: u8,
    message: *mut c_char,
    path: *mut c_char,
}

unsafe extern "C" {
    fn rb_version(major: *mut c_int, minor: *mut c_int, extra: *mut c_int);
    fn rb_binding_version() -> *const c_char;

    fn rb_cluster_create(
        client_name: *const c_char,
        out_cluster: *mut *mut rb_cluster_t,
        out_err: *mut *mut rb_error_t,
    ) -> c_int;
    fn rb_cluster_connect(cluster: *mut rb_cluster_t, out_err: *mut *mut rb_error_t) -> c_int;
    fn rb_cluster_is_connected(cluster: *const rb_cluster_t) -> c_int;
    fn rb_cluster_conf_set(
        cluster: *mut rb_cluster_t,
        key: *const c_char,
        value: *const c_char,
        out_err: *mut *mut rb_error_t,
    ) -> c_int;
    fn rb_cluster_conf_get(
        cluster: *mut rb_cluster_t,
        key: *const c_char,
        out_value: *mut *mut c_char,
        out_err: *mut *mut rb_error_t,
    ) -> c_int;
    fn rb_cluster_conf_read_file(
        cluster: *mut rb_cluster_t,
        path: *const c_char,
        out_err: *mut *mut rb_error_t,
    ) -> c_int;
    fn rb_cluster_free(cluster: *mut rb_cluster_t);

    fn rb_pool_open(
        cluster: *mut rb_cluster_t,
        pool_name: *const c_char,
        out_pool: *mut *mut rb_pool_t,
        out_err: *mut *mut rb_error_t,
    ) -> c_int;
    fn rb_pool_id(pool: *mut rb_pool_t, out_id: *mut i64, out_err: *mut *mut rb_error_t) -> c_int;
    fn rb_pool_free(pool: *mut rb_pool_t);

    fn rb_string_free(value: *mut c_char);
    fn rb_error_free(err: *mut rb_error_t);
}

#[napi]
#[derive(Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Internal = 1,
    Usage = 2,
    Initialization = 3,
    Connection = 4,
    Configuration = 5,
    PoolOpen = 6,
    InvalidHandle = 7,
}

#[napi(object)]
pub struct Version {
    pub major: i32,
    pub minor: i32,
    pub extra: i32,
}

#[napi]
pub fn version() -> Version {
    let (mut major, mut minor, mut extra) = (0, 0, 0);
    unsafe { rb_version(&mut major, &mut minor, &mut extra) };
    Version {
        major,
        minor,
        extra,
    }
}

#[napi]
pub fn binding_version() -> String {
    unsafe { CStr::from_ptr(rb_binding_version()) }
        .to_string_lossy()
        .to_string()
}

#[napi]
pub struct Cluster {
    ptr: *mut rb_cluster_t,
}

#[napi]
impl Cluster {
    #[napi(constructor)]
    pub fn new(client_name: String) -> Result<Self> {
        let client_name = to_c_string(client_name, "client_name")?;
        let mut out = ptr::null_mut();
        let mut err = ptr::null_mut();
        let rc = unsafe { rb_cluster_create(client_name.as_ptr(), &mut out, &mut err) };
        if rc != 0 {
            return Err(take_error(err));
        }
        Ok(Self { ptr: out })
    }

    #[napi]
    pub fn connect(&mut self) -> Result<()> {
        let ptr = self.live_ptr()?;
        let mut err = ptr::null_mut();
        let rc = unsafe { rb_cluster_connect(ptr, &mut err) };
        if rc != 0 {
            return Err(take_error(err));
        }
        Ok(())
    }

    #[napi]
    pub fn is_connected(&self) -> bool {
        unsafe { rb_cluster_is_connected(self.ptr) == 1 }
    }

    #[napi]
    pub fn conf_set(&mut self, key: String, value: String) -> Result<()> {
        let ptr = self.live_ptr()?;
        let key = to_c_string(key, "key")?;
        let value = to_c_string(value, "value")?;
        let mut err = ptr::null_mut();
        let rc = unsafe { rb_cluster_conf_set(ptr, key.as_ptr(), value.as_ptr(), &mut err) };
        if rc != 0 {
            return Err(take_error(err));
        }
        Ok(())
    }

    #[napi]
    pub fn conf_get(&self, key: String) -> Result<String> {
        let ptr = self.live_ptr()?;
        let key = to_c_string(key, "key")?;
        let mut out = ptr::null_mut();
        let mut err = ptr::null_mut();
        let rc = unsafe { rb_cluster_conf_get(ptr, key.as_ptr(), &mut out, &mut err) };
        if rc != 0 {
            return Err(take_error(err));
        }
        Ok(take_string(out))
    }

    #[napi]
    pub fn conf_read_file(&mut self, path: String) -> Result<()> {
        let ptr = self.live_ptr()?;
        let path = to_c_string(path, "path")?;
        let mut err = ptr::null_mut();
        let rc = unsafe { rb_cluster_conf_read_file(ptr, path.as_ptr(), &mut err) };
        if rc != 0 {
            return Err(take_error(err));
        }
        Ok(())
    }

    #[napi]
    pub fn open_pool(&self, name: String) -> Result<Pool> {
        let ptr = self.live_ptr()?;
        let c_name = to_c_string(name.clone(), "name")?;
        let mut out = ptr::null_mut();
        let mut err = ptr::null_mut();
        let rc = unsafe { rb_pool_open(ptr, c_name.as_ptr(), &mut out, &mut err) };
        if rc != 0 {
            return Err(take_error(err));
        }
        Ok(Pool { ptr: out, name })
    }

    #[napi]
    pub fn close(&mut self) {
        if !self.ptr.is_null() {
            unsafe { rb_cluster_free(self.ptr) };
            self.ptr = ptr::null_mut();
        }
    }

    fn live_ptr(&self) -> Result<*mut rb_cluster_t> {
        if self.ptr.is_null() {
            return Err(closed_error("cluster"));
        }
        Ok(self.ptr)
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        self.close();
    }
}

#[napi]
pub struct Pool {
    ptr: *mut rb_pool_t,
    name: String,
}

#[napi]
impl Pool {
    #[napi]
    pub fn id(&self) -> Result<BigInt> {
        if self.ptr.is_null() {
            return Err(closed_error("pool"));
        }
        let mut id = 0i64;
        let mut err = ptr::null_mut();
        let rc = unsafe { rb_pool_id(self.ptr, &mut id, &mut err) };
        if rc != 0 {
            return Err(take_error(err));
        }
        Ok(BigInt::from(id))
    }

    #[napi(getter)]
    pub fn name(&self) -> String {
        self.name.clone()
    }

    #[napi]
    pub fn close(&mut self) {
        if !self.ptr.is_null() {
            unsafe { rb_pool_free(self.ptr) };
            self.ptr = ptr::null_mut();
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.close();
    }
}

fn to_c_string(value: String, name: &str) -> Result<CString> {
    CString::new(value).map_err(|_| Error::new(Status::InvalidArg, format!("{name} contains NUL")))
}

fn take_string(value: *mut c_char) -> String {
    if value.is_null() {
        return String::new();
    }
    let owned = unsafe { CStr::from_ptr(value) }.to_string_lossy().to_string();
    unsafe { rb_string_free(value) };
    owned
}

fn closed_error(what: &str) -> Error {
    Error::new(
        Status::GenericFailure,
        format!(
            "radosbind error: kind=InvalidHandle; message={what} handle is closed"
        ),
    )
}

fn take_error(err: *mut rb_error_t) -> Error {
    if err.is_null() {
        return Error::new(Status::GenericFailure, "radosbind: unknown error");
    }
    let owned = unsafe { &*err };
    let mut message = unsafe { cstring_to_string(owned.message) };
    let path = unsafe { cstring_to_string(owned.path) };
    let mut details = Vec::new();
    let kind_label = error_kind_label(owned.kind);
    details.push(format!("kind={}", kind_label));
    if message.is_empty() {
        message = default_error_message(kind_label).to_string();
    }
    details.push(format!("message={}", message));
    if !path.is_empty() {
        details.push(format!("path={}", path));
    }
    if owned.has_errno != 0 {
        details.push(format!("errno={}", owned.errno));
    }
    unsafe { rb_error_free(err) };
    Error::new(Status::GenericFailure, format!("radosbind error: {}", details.join("; ")))
}

fn default_error_message(kind: &str) -> &'static str {
    match kind {
        "Internal" => "internal error",
        "Usage" => "usage error",
        "Initialization" => "cluster handle creation failed",
        "Connection" => "connection failed",
        "Configuration" => "configuration error",
        "PoolOpen" => "pool open failed",
        "InvalidHandle" => "handle is closed",
        _ => "error",
    }
}

fn error_kind_label(kind: i32) -> &'static str {
    match kind {
        1 => "Internal",
        2 => "Usage",
        3 => "Initialization",
        4 => "Connection",
        5 => "Configuration",
        6 => "PoolOpen",
        7 => "InvalidHandle",
        _ => "Internal",
    }
}

unsafe fn cstring_to_string(ptr: *mut c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().to_string()
}
