#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RemoteErrorKind {
    /// The database could not be reached. Trying again later may succeed.
    Unavailable,
    /// The database refused the operation, e.g. a security rule denied it.
    Rejected,
    /// The database answered with something we could not interpret.
    Malformed,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Unavailable, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Rejected, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Malformed, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == RemoteErrorKind::Unavailable
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("local storage error: {0}")]
pub struct LocalStorageError(pub String);

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("store is already initialized")]
    AlreadyInitialized,
    #[error("handler does not expose a change listener")]
    InvalidHandler,
    #[error("store is not initialized")]
    NotInitialized,
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("store error: {0}")]
    Store(#[from] RemoteError),
    #[error("legacy records could not be parsed: {0}")]
    MigrationParse(String),
}

impl SyncError {
    /// Stable tag used when the error crosses into JS.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::AlreadyInitialized => "alreadyInitialized",
            SyncError::InvalidHandler => "invalidHandler",
            SyncError::NotInitialized => "notInitialized",
            SyncError::InvalidRecord(_) => "invalidRecord",
            SyncError::Store(_) => "storeError",
            SyncError::MigrationParse(_) => "migrationParseError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_keeps_remote_message() {
        let error: SyncError = RemoteError::rejected("PERMISSION_DENIED").into();
        assert_eq!(error.to_string(), "store error: PERMISSION_DENIED");
        assert_eq!(error.kind(), "storeError");
    }

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(RemoteError::unavailable("offline").is_retryable());
        assert!(!RemoteError::rejected("denied").is_retryable());
        assert!(!RemoteError::malformed("bad json").is_retryable());
    }
}
