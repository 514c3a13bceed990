use derive_more::Display;

/// Errors produced by the changelist and shelve stores.
///
/// Validation and not-found failures are raised synchronously before any
/// I/O; conflict failures come out of unshelve only; backend and I/O
/// failures propagate from the git wrapper or the filesystem and are never
/// retried here.
#[derive(Debug, Display)]
pub enum Error {
    /// Bad user input: empty or duplicate names, empty selections
    #[display(fmt = "validation error: {}", _0)]
    Validation(String),

    /// An id that does not (or no longer does) resolve to an entity
    #[display(fmt = "not found: {}", _0)]
    NotFound(String),

    /// Unshelve refused because the working tree diverged
    #[display(fmt = "unshelve conflicts in {} file(s)", "_0.len()")]
    Conflict(Vec<String>),

    /// Failure reported by the version-control backend
    #[display(fmt = "backend error: {}", _0)]
    Backend(String),

    /// Filesystem failure during restore or persistence
    #[display(fmt = "io error: {}", _0)]
    Io(std::io::Error),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Backend(format!("{:#}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Backend(format!("serialization failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Paths blocking an unshelve, when this is a conflict error
    pub fn conflicting_paths(&self) -> Option<&[String]> {
        match self {
            Error::Conflict(paths) => Some(paths),
            _ => None,
        }
    }
}
