//! Purpose: In-process `Driver` that simulates a cluster for tests and offline hosts.
//! Exports: `MemoryCluster`, `MemoryConn`, `MemoryIoctx`.
//! Role: Test double for the handle layer; mirrors librados errno conventions.
//! Invariants: Shared state lives behind one mutex; clones observe the same cluster.
//! Invariants: Live connection/ioctx counts reflect exactly the unreleased handles.
//! Notes: Config files use the ceph.conf dialect; unknown keys in files are ignored.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ffi::CStr;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Driver, NativeResult};
use crate::core::version::Version;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum OptionType {
    Str,
    Int,
    Float,
    Bool,
}

const OPTIONS: &[(&str, OptionType, &str)] = &[
    ("mon_host", OptionType::Str, ""),
    ("fsid", OptionType::Str, ""),
    ("keyring", OptionType::Str, "/etc/ceph/ceph.keyring"),
    ("key", OptionType::Str, ""),
    ("auth_client_required", OptionType::Str, "cephx, none"),
    ("log_file", OptionType::Str, ""),
    ("log_to_stderr", OptionType::Bool, "true"),
    ("debug_rados", OptionType::Str, "0/5"),
    ("ms_type", OptionType::Str, "async+posix"),
    ("client_mount_timeout", OptionType::Float, "300"),
    ("rados_mon_op_timeout", OptionType::Float, "0"),
    ("rados_osd_op_timeout", OptionType::Float, "0"),
    ("objecter_inflight_ops", OptionType::Int, "1024"),
];

const DEFAULT_VERSION: Version = Version::new(3, 0, 0);

/// Connection reference handed out by `MemoryCluster::create`.
#[derive(Debug)]
pub struct MemoryConn {
    id: u64,
}

/// I/O context reference handed out by `MemoryCluster::ioctx_create`.
#[derive(Debug)]
pub struct MemoryIoctx {
    id: u64,
    pool_id: i64,
}

#[derive(Debug)]
struct Connection {
    entity: String,
    values: BTreeMap<String, String>,
    connected: bool,
}

#[derive(Debug)]
struct State {
    version: Version,
    reachable: bool,
    pools: BTreeMap<String, i64>,
    next_pool_id: i64,
    rejected_entities: BTreeSet<String>,
    connections: HashMap<u64, Connection>,
    ioctxs: BTreeSet<u64>,
    next_handle: u64,
}

/// A simulated cluster shared by every clone.
#[derive(Clone, Debug)]
pub struct MemoryCluster {
    state: Arc<Mutex<State>>,
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                version: DEFAULT_VERSION,
                reachable: true,
                pools: BTreeMap::new(),
                next_pool_id: 1,
                rejected_entities: BTreeSet::new(),
                connections: HashMap::new(),
                ioctxs: BTreeSet::new(),
                next_handle: 1,
            })),
        }
    }

    pub fn with_version(self, version: Version) -> Self {
        self.lock().version = version;
        self
    }

    /// Adds a pool with the next free id.
    pub fn with_pool(self, name: impl Into<String>) -> Self {
        {
            let mut state = self.lock();
            let id = state.next_pool_id;
            state.next_pool_id += 1;
            state.pools.insert(name.into(), id);
        }
        self
    }

    pub fn with_pool_id(self, name: impl Into<String>, id: i64) -> Self {
        {
            let mut state = self.lock();
            state.next_pool_id = state.next_pool_id.max(id.saturating_add(1));
            state.pools.insert(name.into(), id);
        }
        self
    }

    /// Makes `create` fail with `-EINVAL` for this entity name.
    pub fn reject_entity(self, entity_name: impl Into<String>) -> Self {
        self.lock().rejected_entities.insert(entity_name.into());
        self
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.lock().reachable = reachable;
    }

    pub fn remove_pool(&self, name: &str) -> bool {
        self.lock().pools.remove(name).is_some()
    }

    pub fn live_connections(&self) -> usize {
        self.lock().connections.len()
    }

    pub fn live_ioctxs(&self) -> usize {
        self.lock().ioctxs.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Driver for MemoryCluster {
    type Cluster = MemoryConn;
    type Ioctx = MemoryIoctx;

    fn version(&self) -> Version {
        self.lock().version
    }

    fn create(&self, _cluster_name: &CStr, entity_name: &CStr) -> NativeResult<MemoryConn> {
        let entity = entity_name.to_str().map_err(|_| -libc::EINVAL)?;
        let mut state = self.lock();
        if state.rejected_entities.contains(entity) {
            return Err(-libc::EINVAL);
        }
        let id = state.next_handle;
        state.next_handle += 1;
        let values = OPTIONS
            .iter()
            .map(|(key, _, default)| (key.to_string(), default.to_string()))
            .collect();
        state.connections.insert(
            id,
            Connection {
                entity: entity.to_string(),
                values,
                connected: false,
            },
        );
        Ok(MemoryConn { id })
    }

    fn connect(&self, cluster: &mut MemoryConn) -> NativeResult<()> {
        let mut state = self.lock();
        let reachable = state.reachable;
        let conn = state.connections.get_mut(&cluster.id).ok_or(-libc::EBADF)?;
        if conn.connected {
            return Err(-libc::EISCONN);
        }
        let has_monitors = conn
            .values
            .get("mon_host")
            .is_some_and(|value| !value.trim().is_empty());
        if !has_monitors {
            return Err(-libc::ENOENT);
        }
        if !reachable {
            return Err(-libc::ETIMEDOUT);
        }
        conn.connected = true;
        Ok(())
    }

    fn shutdown(&self, cluster: MemoryConn) {
        self.lock().connections.remove(&cluster.id);
    }

    fn conf_set(&self, cluster: &mut MemoryConn, key: &CStr, value: &CStr) -> NativeResult<()> {
        let key = key.to_str().map_err(|_| -libc::EINVAL)?;
        let value = value.to_str().map_err(|_| -libc::EINVAL)?;
        let mut state = self.lock();
        let conn = state.connections.get_mut(&cluster.id).ok_or(-libc::EBADF)?;
        set_option(&mut conn.values, key, value)
    }

    fn conf_get(&self, cluster: &MemoryConn, key: &CStr, buf: &mut [u8]) -> NativeResult<()> {
        let key = key.to_str().map_err(|_| -libc::EINVAL)?;
        let state = self.lock();
        let conn = state.connections.get(&cluster.id).ok_or(-libc::EBADF)?;
        let key = normalize_key(key);
        let value = if key == "name" {
            conn.entity.as_str()
        } else {
            conn.values.get(&key).ok_or(-libc::ENOENT)?.as_str()
        };
        let bytes = value.as_bytes();
        if bytes.len() >= buf.len() {
            return Err(-libc::ENAMETOOLONG);
        }
        buf[..bytes.len()].copy_from_slice(bytes);
        buf[bytes.len()] = 0;
        Ok(())
    }

    fn conf_read_file(&self, cluster: &mut MemoryConn, path: &CStr) -> NativeResult<()> {
        let path = path.to_str().map_err(|_| -libc::EINVAL)?;
        let text = std::fs::read_to_string(path)
            .map_err(|err| -err.raw_os_error().unwrap_or(libc::EIO))?;
        let sections = parse_conf(&text)?;

        let mut state = self.lock();
        let conn = state.connections.get_mut(&cluster.id).ok_or(-libc::EBADF)?;
        let entity_type = conn
            .entity
            .split_once('.')
            .map(|(kind, _)| kind.to_string())
            .unwrap_or_else(|| conn.entity.clone());
        // Later sections override earlier ones: global < type < entity.
        let order = ["global".to_string(), entity_type, conn.entity.clone()];
        let mut staged = conn.values.clone();
        for section in order.iter() {
            let Some(entries) = sections.get(section) else {
                continue;
            };
            for (key, value) in entries {
                if option_type(key).is_none() {
                    continue;
                }
                set_option(&mut staged, key, value)?;
            }
        }
        conn.values = staged;
        Ok(())
    }

    fn ioctx_create(&self, cluster: &MemoryConn, pool_name: &CStr) -> NativeResult<MemoryIoctx> {
        let pool_name = pool_name.to_str().map_err(|_| -libc::EINVAL)?;
        let mut state = self.lock();
        let conn = state.connections.get(&cluster.id).ok_or(-libc::EBADF)?;
        if !conn.connected {
            return Err(-libc::ENOTCONN);
        }
        if !state.reachable {
            return Err(-libc::ETIMEDOUT);
        }
        let pool_id = *state.pools.get(pool_name).ok_or(-libc::ENOENT)?;
        let id = state.next_handle;
        state.next_handle += 1;
        state.ioctxs.insert(id);
        Ok(MemoryIoctx { id, pool_id })
    }

    fn ioctx_destroy(&self, ioctx: MemoryIoctx) {
        self.lock().ioctxs.remove(&ioctx.id);
    }

    fn ioctx_pool_id(&self, ioctx: &MemoryIoctx) -> i64 {
        ioctx.pool_id
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().replace(['-', ' '], "_")
}

fn option_type(key: &str) -> Option<OptionType> {
    let key = normalize_key(key);
    OPTIONS
        .iter()
        .find(|(name, _, _)| *name == key)
        .map(|(_, kind, _)| *kind)
}

fn set_option(values: &mut BTreeMap<String, String>, key: &str, value: &str) -> NativeResult<()> {
    let kind = option_type(key).ok_or(-libc::ENOENT)?;
    let typed = value.trim();
    let valid = match kind {
        OptionType::Str => true,
        OptionType::Int => typed.parse::<i64>().is_ok(),
        OptionType::Float => typed.parse::<f64>().is_ok_and(f64::is_finite),
        OptionType::Bool => matches!(typed, "true" | "false" | "1" | "0"),
    };
    if !valid {
        return Err(-libc::EINVAL);
    }
    values.insert(normalize_key(key), value.to_string());
    Ok(())
}

type Sections = HashMap<String, Vec<(String, String)>>;

fn parse_conf(text: &str) -> NativeResult<Sections> {
    let mut sections: Sections = HashMap::new();
    let mut current = "global".to_string();
    for raw_line in text.lines() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix('[') {
            let name = rest.strip_suffix(']').ok_or(-libc::EINVAL)?.trim();
            if name.is_empty() {
                return Err(-libc::EINVAL);
            }
            current = name.to_string();
            continue;
        }
        let (key, value) = line.split_once('=').ok_or(-libc::EINVAL)?;
        let key = key.trim();
        if key.is_empty() {
            return Err(-libc::EINVAL);
        }
        sections
            .entry(current.clone())
            .or_default()
            .push((key.to_string(), value.trim().to_string()));
    }
    Ok(sections)
}

fn strip_comment(line: &str) -> &str {
    match line.find(['#', ';']) {
        Some(index) => &line[..index],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryCluster, parse_conf};
    use crate::core::native::Driver;
    use std::io::Write;

    fn conn(cluster: &MemoryCluster) -> super::MemoryConn {
        cluster.create(c"ceph", c"client.admin").expect("create")
    }

    fn get(cluster: &MemoryCluster, conn: &super::MemoryConn, key: &std::ffi::CStr) -> String {
        let mut buf = [0u8; 256];
        cluster.conf_get(conn, key, &mut buf).expect("get");
        let end = buf.iter().position(|b| *b == 0).expect("terminator");
        String::from_utf8(buf[..end].to_vec()).expect("utf8")
    }

    #[test]
    fn conf_sections_and_comments_parse() {
        let text = "; leading comment\n[global]\nmon host = 10.0.0.1 # inline\n\n[client.admin]\nkeyring=/tmp/k\n";
        let sections = parse_conf(text).expect("parse");
        assert_eq!(
            sections["global"],
            vec![("mon host".to_string(), "10.0.0.1".to_string())]
        );
        assert_eq!(
            sections["client.admin"],
            vec![("keyring".to_string(), "/tmp/k".to_string())]
        );
    }

    #[test]
    fn malformed_conf_lines_are_rejected() {
        assert_eq!(parse_conf("[global\n").unwrap_err(), -libc::EINVAL);
        assert_eq!(parse_conf("mon_host 10.0.0.1\n").unwrap_err(), -libc::EINVAL);
        assert_eq!(parse_conf("[]\n").unwrap_err(), -libc::EINVAL);
    }

    #[test]
    fn entity_section_overrides_global() {
        let cluster = MemoryCluster::new();
        let mut conn = conn(&cluster);
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            "[client.admin]\nlog_file = /var/log/admin.log\n[global]\nlog_file = /var/log/global.log\nmon_host = 10.0.0.1\nunknown_key = 1\n[client.other]\nlog_file = /nope"
        )
        .expect("write");
        let path = std::ffi::CString::new(file.path().to_str().expect("utf8")).expect("cstring");
        cluster.conf_read_file(&mut conn, &path).expect("read");

        assert_eq!(get(&cluster, &conn, c"log_file"), "/var/log/admin.log");
        assert_eq!(get(&cluster, &conn, c"mon_host"), "10.0.0.1");
        cluster.shutdown(conn);
    }

    #[test]
    fn typed_options_reject_malformed_values() {
        let cluster = MemoryCluster::new();
        let mut conn = conn(&cluster);
        assert_eq!(
            cluster.conf_set(&mut conn, c"rados_osd_op_timeout", c"soon"),
            Err(-libc::EINVAL)
        );
        assert_eq!(
            cluster.conf_set(&mut conn, c"log-to-stderr", c"maybe"),
            Err(-libc::EINVAL)
        );
        assert_eq!(cluster.conf_set(&mut conn, c"rados-osd-op-timeout", c"5"), Ok(()));
        assert_eq!(get(&cluster, &conn, c"rados_osd_op_timeout"), "5");
        cluster.shutdown(conn);
    }

    #[test]
    fn connect_requires_monitors_and_reachability() {
        let cluster = MemoryCluster::new().with_pool("rbd");
        let mut conn = conn(&cluster);
        assert_eq!(cluster.connect(&mut conn), Err(-libc::ENOENT));

        cluster
            .conf_set(&mut conn, c"mon_host", c"10.0.0.1")
            .expect("set");
        cluster.set_reachable(false);
        assert_eq!(cluster.connect(&mut conn), Err(-libc::ETIMEDOUT));

        cluster.set_reachable(true);
        assert_eq!(cluster.connect(&mut conn), Ok(()));
        assert_eq!(cluster.connect(&mut conn), Err(-libc::EISCONN));
        cluster.shutdown(conn);
        assert_eq!(cluster.live_connections(), 0);
    }

    #[test]
    fn small_buffers_report_name_too_long() {
        let cluster = MemoryCluster::new();
        let conn = conn(&cluster);
        let mut buf = [0u8; 4];
        assert_eq!(
            cluster.conf_get(&conn, c"ms_type", &mut buf),
            Err(-libc::ENAMETOOLONG)
        );
        cluster.shutdown(conn);
    }
}
