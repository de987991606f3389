// Outcome types for dispatched requests.

use crate::config::ConfigError;
use reqwest::StatusCode;
use thiserror::Error;

/// Why a dispatch did not produce a value.
///
/// `NotAuthenticated` and `Config` mean the request was never sent.
/// `Failed` means it was sent (or attempted) and the message is ready to
/// show to the user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Not logged in")]
    NotAuthenticated,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{message}")]
    Failed {
        message: String,
        /// `None` when no response came back at all.
        status: Option<StatusCode>,
    },
}

impl DispatchError {
    /// True when the request never left the process.
    pub fn is_skipped(&self) -> bool {
        !matches!(self, DispatchError::Failed { .. })
    }
}

/// Caller-owned error message for code that prefers an out-parameter to
/// matching on `DispatchError`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorSlot {
    value: String,
}

impl ErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }

    /// Unwrap a dispatch result. Only `Failed` touches the slot; skipped
    /// requests leave it as it was.
    pub fn record<T>(&mut self, result: Result<T, DispatchError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(DispatchError::Failed { message, .. }) => {
                self.value = message;
                None
            }
            Err(_) => None,
        }
    }
}
