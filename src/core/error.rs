// Error model shared by the handles, the C ABI, and the CLI.
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    Initialization,
    Connection,
    Configuration,
    PoolOpen,
    InvalidHandle,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    path: Option<PathBuf>,
    key: Option<String>,
    pool: Option<String>,
    errno: Option<i32>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            path: None,
            key: None,
            pool: None,
            errno: None,
            source: None,
        }
    }

    /// Wraps a negative errno returned by the native library.
    ///
    /// The OS description of the code becomes the error source, so `Display`
    /// of the chain reads like `Connection: connect failed (errno: -110)`
    /// followed by `Connection timed out`.
    pub fn native(kind: ErrorKind, code: i32) -> Self {
        Self::new(kind)
            .with_errno(code)
            .with_source(io::Error::from_raw_os_error(code.saturating_abs()))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn pool(&self) -> Option<&str> {
        self.pool.as_deref()
    }

    pub fn errno(&self) -> Option<i32> {
        self.errno
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_pool(mut self, pool: impl Into<String>) -> Self {
        self.pool = Some(pool.into());
        self
    }

    pub fn with_errno(mut self, errno: i32) -> Self {
        self.errno = Some(errno);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(key) = &self.key {
            write!(f, " (key: {key})")?;
        }
        if let Some(pool) = &self.pool {
            write!(f, " (pool: {pool})")?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        if let Some(errno) = self.errno {
            write!(f, " (errno: {errno})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::Initialization => 3,
        ErrorKind::Connection => 4,
        ErrorKind::Configuration => 5,
        ErrorKind::PoolOpen => 6,
        ErrorKind::InvalidHandle => 7,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, to_exit_code};
    use std::error::Error as StdError;

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::Internal, 1),
            (ErrorKind::Usage, 2),
            (ErrorKind::Initialization, 3),
            (ErrorKind::Connection, 4),
            (ErrorKind::Configuration, 5),
            (ErrorKind::PoolOpen, 6),
            (ErrorKind::InvalidHandle, 7),
        ];

        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn native_errors_carry_errno_and_os_source() {
        let err = Error::native(ErrorKind::Connection, -libc::ETIMEDOUT)
            .with_message("connect failed");
        assert_eq!(err.errno(), Some(-libc::ETIMEDOUT));
        let rendered = err.to_string();
        assert!(rendered.starts_with("Connection: connect failed"));
        assert!(rendered.contains(&format!("errno: {}", -libc::ETIMEDOUT)));

        let source = err.source().expect("source");
        let io_err = source.downcast_ref::<std::io::Error>().expect("io error");
        assert_eq!(io_err.raw_os_error(), Some(libc::ETIMEDOUT));
    }

    #[test]
    fn display_includes_context_fields() {
        let err = Error::new(ErrorKind::Configuration)
            .with_message("failed to read config value")
            .with_key("mon_host");
        assert_eq!(
            err.to_string(),
            "Configuration: failed to read config value (key: mon_host)"
        );
    }
}
