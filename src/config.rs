// Configuration lookup: the backend base URL comes from the process
// environment and is read again on every call, so nothing here is cached.

use std::collections::HashMap;
use thiserror::Error;

/// Environment variable holding the backend root address.
pub const API_URL_VAR: &str = "API_URL";

/// Raised when the environment does not provide what a request needs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The message is the user-facing alert text.
    #[error("未找到环境变量 {0}")]
    MissingVar(&'static str),
}

/// Read-only view over environment variables.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Resolve the base URL. An empty value counts as missing.
pub fn base_url(env: &impl EnvSource) -> Result<String, ConfigError> {
    env.var(API_URL_VAR)
        .filter(|url| !url.is_empty())
        .ok_or(ConfigError::MissingVar(API_URL_VAR))
}
