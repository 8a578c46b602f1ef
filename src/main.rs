//! Purpose: `radosbind` CLI entry point: version query and connection probes.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit JSON on stdout; diagnostics and logs go to stderr.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Every handle opened by a command is closed before it returns.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

use radosbind::api::{
    BINDING_VERSION, ClusterHandle, ClusterOptions, Error, ErrorKind, Librados, to_exit_code,
    version,
};

#[derive(Parser)]
#[command(
    name = "radosbind",
    version,
    about = "Inspect librados connectivity through radosbind handles",
    after_help = r#"EXAMPLES
  $ radosbind version
  $ radosbind probe --conf /etc/ceph/ceph.conf --pool rbd
  $ radosbind probe --client rgw --set mon_host=10.0.0.1 --pool default.rgw.meta
  $ radosbind conf-get --conf /etc/ceph/ceph.conf mon_host keyring

NOTES
  - Logs go to stderr; tune with RUST_LOG (default: warn)"#
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Print the librados and binding versions")]
    Version,
    #[command(about = "Connect, open pools, report their ids, and disconnect")]
    Probe {
        #[command(flatten)]
        connect: ConnectArgs,
        #[arg(long = "pool", value_name = "NAME", help = "Pool to open (repeatable)")]
        pools: Vec<String>,
    },
    #[command(about = "Read configuration values without connecting")]
    ConfGet {
        #[command(flatten)]
        connect: ConnectArgs,
        #[arg(required = true, value_name = "KEY")]
        keys: Vec<String>,
    },
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

#[derive(Args)]
struct ConnectArgs {
    #[arg(long, value_name = "ID", help = "Client id or full entity name [default: admin]")]
    client: Option<String>,
    #[arg(long, value_name = "NAME", help = "Cluster name [default: ceph]")]
    cluster: Option<String>,
    #[arg(long, value_name = "PATH", help = "ceph.conf-style file to load")]
    conf: Option<PathBuf>,
    #[arg(long, value_name = "PATH", help = "JSON connection profile")]
    options: Option<PathBuf>,
    #[arg(
        long = "set",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value,
        help = "Config override applied after files (repeatable)"
    )]
    overrides: Vec<(String, String)>,
}

impl ConnectArgs {
    fn into_options(self) -> Result<ClusterOptions, Error> {
        let mut options = match &self.options {
            Some(path) => ClusterOptions::from_json_file(path)?,
            None => ClusterOptions::new("admin"),
        };
        if let Some(client) = self.client {
            options.client_name = client;
        }
        if let Some(cluster) = self.cluster {
            options.cluster_name = cluster;
        }
        if let Some(conf) = self.conf {
            options.conf_file = Some(conf);
        }
        options.overrides.extend(self.overrides);
        Ok(options)
    }
}

fn parse_key_value(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{input}`"))?;
    if key.trim().is_empty() {
        return Err("config key must not be empty".to_string());
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(code) => code,
        Err(err) => {
            let err = add_hint(err);
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<i32, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(code);
            }
            _ => {
                let message = err
                    .to_string()
                    .lines()
                    .next()
                    .unwrap_or("invalid arguments")
                    .trim_start_matches("error: ")
                    .to_string();
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(message)
                    .with_hint("run `radosbind --help` for usage"));
            }
        },
    };

    let output = match cli.command {
        Command::Version => version_json(),
        Command::Probe { connect, pools } => probe(connect.into_options()?, &pools)?,
        Command::ConfGet { connect, keys } => conf_get(connect.into_options()?, &keys)?,
        Command::Completion { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "radosbind", &mut io::stdout());
            return Ok(0);
        }
    };
    emit_json(&output)?;
    Ok(0)
}

fn version_json() -> Value {
    json!({
        "librados": version(),
        "binding": BINDING_VERSION,
    })
}

fn probe(options: ClusterOptions, pools: &[String]) -> Result<Value, Error> {
    let mut cluster = ClusterHandle::from_options(Librados, &options)?;
    cluster.connect()?;

    let mut reports = Vec::with_capacity(pools.len());
    for name in pools {
        let mut pool = cluster.open_pool(name)?;
        let id = pool.id()?;
        pool.close();
        reports.push(json!({ "name": pool.name(), "id": id }));
    }

    let connected = cluster.is_connected();
    let report = json!({
        "cluster": cluster.cluster_name(),
        "client": cluster.entity_name(),
        "connected": connected,
        "pools": reports,
    });
    cluster.close();
    Ok(report)
}

fn conf_get(options: ClusterOptions, keys: &[String]) -> Result<Value, Error> {
    let mut cluster = ClusterHandle::from_options(Librados, &options)?;
    let mut values = Map::new();
    for key in keys {
        values.insert(key.clone(), Value::String(cluster.config_get(key)?));
    }
    cluster.close();
    Ok(Value::Object(values))
}

fn emit_json(value: &Value) -> Result<(), Error> {
    let text = serde_json::to_string_pretty(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode output")
            .with_source(err)
    })?;
    println!("{text}");
    Ok(())
}

fn add_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match (err.kind(), err.errno()) {
        (ErrorKind::Initialization, Some(code)) if code == -libc::ENOSYS => err.with_hint(
            "this build is not linked against librados; rebuild with `--features librados`",
        ),
        (ErrorKind::Connection, Some(code)) if code == -libc::ENOENT => {
            err.with_hint("no monitors configured; pass --conf or --set mon_host=<addr>")
        }
        (ErrorKind::Connection, Some(code)) if code == -libc::ETIMEDOUT => {
            err.with_hint("monitors did not answer; check mon_host and network reachability")
        }
        (ErrorKind::PoolOpen, Some(code)) if code == -libc::ENOENT => {
            err.with_hint("pool does not exist; list pools with `ceph osd pool ls`")
        }
        _ => err,
    }
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }
    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    err.message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?} error", err.kind()))
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = err.source();
    while let Some(source) = current {
        causes.push(source.to_string());
        current = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(key) = err.key() {
        inner.insert("key".to_string(), json!(key));
    }
    if let Some(pool) = err.pool() {
        inner.insert("pool".to_string(), json!(pool));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(errno) = err.errno() {
        inner.insert("errno".to_string(), json!(errno));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(key) = err.key() {
        lines.push(format!("key: {key}"));
    }
    if let Some(pool) = err.pool() {
        lines.push(format!("pool: {pool}"));
    }
    if let Some(path) = err.path() {
        lines.push(format!("path: {}", path.display()));
    }
    for cause in error_causes(err) {
        lines.push(format!("caused by: {cause}"));
    }
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{ConnectArgs, add_hint, error_json, error_text, parse_key_value};
    use radosbind::api::{Error, ErrorKind};

    #[test]
    fn key_value_pairs_parse() {
        assert_eq!(
            parse_key_value("mon_host=10.0.0.1:6789").expect("pair"),
            ("mon_host".to_string(), "10.0.0.1:6789".to_string())
        );
        assert_eq!(
            parse_key_value("key=a=b").expect("pair"),
            ("key".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn flags_override_profile_defaults() {
        let args = ConnectArgs {
            client: Some("rgw".to_string()),
            cluster: None,
            conf: Some("/etc/ceph/ceph.conf".into()),
            options: None,
            overrides: vec![("mon_host".to_string(), "10.0.0.1".to_string())],
        };
        let options = args.into_options().expect("options");
        assert_eq!(options.client_name, "rgw");
        assert_eq!(options.cluster_name, "ceph");
        assert_eq!(
            options.conf_file.as_deref(),
            Some(std::path::Path::new("/etc/ceph/ceph.conf"))
        );
        assert_eq!(options.overrides["mon_host"], "10.0.0.1");
    }

    #[test]
    fn unlinked_builds_get_a_hint() {
        let err = add_hint(Error::native(ErrorKind::Initialization, -libc::ENOSYS));
        assert!(err.hint().expect("hint").contains("--features librados"));
    }

    #[test]
    fn error_json_carries_context() {
        let err = Error::native(ErrorKind::PoolOpen, -libc::ENOENT)
            .with_message("failed to open pool")
            .with_pool("rbd");
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "PoolOpen");
        assert_eq!(value["error"]["pool"], "rbd");
        assert_eq!(value["error"]["errno"], -libc::ENOENT);
        assert!(value["error"]["causes"].as_array().is_some_and(|c| !c.is_empty()));
        assert!(error_text(&err).starts_with("error: failed to open pool"));
    }
}
