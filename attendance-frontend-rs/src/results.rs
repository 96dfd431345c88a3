//! What JS gets back from store operations. Failures come back as values, never as thrown
//! exceptions, so UI code can branch on `success` without try/catch.

use rollcall::{Ack, MigrationOutcome, RemoteError, SyncError};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi))]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub kind: String,
    pub message: String,
    pub retryable: bool,
}

impl ErrorInfo {
    pub fn from_remote(error: &RemoteError) -> Self {
        Self {
            kind: "storeError".to_string(),
            message: error.message.clone(),
            retryable: error.is_retryable(),
        }
    }
}

impl From<&SyncError> for ErrorInfo {
    fn from(error: &SyncError) -> Self {
        Self {
            kind: error.kind().to_string(),
            message: error.to_string(),
            retryable: matches!(error, SyncError::Store(e) if e.is_retryable()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi))]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl OperationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            id: None,
            error: None,
        }
    }

    pub fn failed(error: &SyncError) -> Self {
        Self {
            success: false,
            id: None,
            error: Some(error.into()),
        }
    }
}

impl From<Result<Ack, SyncError>> for OperationResult {
    fn from(result: Result<Ack, SyncError>) -> Self {
        match result {
            Ok(ack) => Self {
                id: Some(ack.id),
                ..Self::ok()
            },
            Err(e) => Self::failed(&e),
        }
    }
}

impl From<Result<(), SyncError>> for OperationResult {
    fn from(result: Result<(), SyncError>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::failed(&e),
        }
    }
}

/// Result of `migrate()`. A legacy value that isn't JSON comes back as an error with kind
/// `migrationParseError`; the migration stays pending.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi))]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MigrationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl From<Result<MigrationOutcome, SyncError>> for MigrationResult {
    fn from(result: Result<MigrationOutcome, SyncError>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                outcome: Some(outcome),
                error: None,
            },
            Err(e) => Self {
                success: false,
                outcome: None,
                error: Some((&e).into()),
            },
        }
    }
}
