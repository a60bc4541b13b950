use imgrepo_model::{ErrorKind, ModelError};
use thiserror::Error;

/// Error taxonomy shared by every layer of the repository.
///
/// Each layer wraps failures with [`RepoError::context`], which keeps the
/// variant so callers can still branch on the kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("access denied: {0}")]
    Authorization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("already exists: {0}")]
    Duplicate(String),

    #[error("incorrect username or password")]
    Credential,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, RepoError>;

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepoError::Authentication(_) => ErrorKind::Authentication,
            RepoError::Authorization(_) => ErrorKind::Authorization,
            RepoError::NotFound(_) => ErrorKind::NotFound,
            RepoError::Validation(_) => ErrorKind::Validation,
            RepoError::Storage(_) => ErrorKind::Storage,
            RepoError::Duplicate(_) => ErrorKind::Duplicate,
            RepoError::Credential => ErrorKind::Credential,
            RepoError::Transport(_) => ErrorKind::Transport,
            RepoError::DeadlineExceeded(_) => ErrorKind::DeadlineExceeded,
            RepoError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Rebuild an error from its wire kind, e.g. on the client side.
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Authentication => RepoError::Authentication(message),
            ErrorKind::Authorization => RepoError::Authorization(message),
            ErrorKind::NotFound => RepoError::NotFound(message),
            ErrorKind::Validation => RepoError::Validation(message),
            ErrorKind::Storage => RepoError::Storage(message),
            ErrorKind::Duplicate => RepoError::Duplicate(message),
            ErrorKind::Credential => RepoError::Credential,
            ErrorKind::Transport => RepoError::Transport(message),
            ErrorKind::DeadlineExceeded => RepoError::DeadlineExceeded(message),
            ErrorKind::Internal => RepoError::Internal(message),
        }
    }

    /// Bare message without the kind prefix added by `Display`.
    pub fn message(&self) -> String {
        match self {
            RepoError::Authentication(msg)
            | RepoError::Authorization(msg)
            | RepoError::NotFound(msg)
            | RepoError::Validation(msg)
            | RepoError::Storage(msg)
            | RepoError::Duplicate(msg)
            | RepoError::Transport(msg)
            | RepoError::DeadlineExceeded(msg)
            | RepoError::Internal(msg) => msg.clone(),
            RepoError::Credential => "incorrect username or password".into(),
        }
    }

    /// Prefix the message with operation context, keeping the variant.
    pub fn context(self, context: impl std::fmt::Display) -> Self {
        let wrap = |msg: String| format!("{context}: {msg}");
        match self {
            RepoError::Authentication(msg) => {
                RepoError::Authentication(wrap(msg))
            }
            RepoError::Authorization(msg) => RepoError::Authorization(wrap(msg)),
            RepoError::NotFound(msg) => RepoError::NotFound(wrap(msg)),
            RepoError::Validation(msg) => RepoError::Validation(wrap(msg)),
            RepoError::Storage(msg) => RepoError::Storage(wrap(msg)),
            RepoError::Duplicate(msg) => RepoError::Duplicate(wrap(msg)),
            // Identical for unknown users and wrong passwords.
            RepoError::Credential => RepoError::Credential,
            RepoError::Transport(msg) => RepoError::Transport(wrap(msg)),
            RepoError::DeadlineExceeded(msg) => {
                RepoError::DeadlineExceeded(wrap(msg))
            }
            RepoError::Internal(msg) => RepoError::Internal(wrap(msg)),
        }
    }
}

/// Attach operation context to the error side of a result.
pub trait ResultExt<T> {
    fn context(self, context: impl std::fmt::Display) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl std::fmt::Display) -> Result<T> {
        self.map_err(|err| err.context(context))
    }
}

impl From<ModelError> for RepoError {
    fn from(err: ModelError) -> Self {
        RepoError::Validation(err.to_string())
    }
}

impl From<std::io::Error> for RepoError {
    fn from(err: std::io::Error) -> Self {
        RepoError::Transport(err.to_string())
    }
}

impl From<tokio::task::JoinError> for RepoError {
    fn from(err: tokio::task::JoinError) -> Self {
        RepoError::Internal(format!("blocking task failed: {err}"))
    }
}
