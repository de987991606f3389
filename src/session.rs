// Session credential lookup. The dispatcher only needs to know whether a
// `session` cookie exists and what its value is; where cookies live is up
// to the `CookieSource` implementation.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the cookie carrying the session credential.
pub const SESSION_COOKIE: &str = "session";

/// Overrides the default cookie file location.
pub const COOKIE_FILE_VAR: &str = "SESSION_DISPATCH_COOKIES";

const DEFAULT_COOKIE_FILE: &str = ".session_dispatch_cookies";

/// RFC 6265 `cookie-value` octets: printable ASCII without whitespace,
/// `"`, `,`, `;` or `\`.
pub fn is_valid_cookie_value(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E))
}

/// Anything that can answer "what is the value of cookie `name`?".
/// Implementations return `None` for absent or empty cookies.
pub trait CookieSource {
    fn cookie(&self, name: &str) -> Option<String>;
}

impl CookieSource for HashMap<String, String> {
    fn cookie(&self, name: &str) -> Option<String> {
        self.get(name).filter(|v| !v.is_empty()).cloned()
    }
}

/// Cookie store persisted as `name=value` lines in a plain file. The CLI
/// uses it to keep the session between runs.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SessionFile { path: path.into() }
    }

    /// `$SESSION_DISPATCH_COOKIES` if set, otherwise a dotfile in the
    /// user's home directory.
    pub fn default_location() -> Self {
        if let Some(path) = std::env::var_os(COOKIE_FILE_VAR) {
            return SessionFile::new(path);
        }
        let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        SessionFile::new(dir.join(DEFAULT_COOKIE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every cookie in the file. A missing file is an empty jar.
    pub fn load(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read cookie file {}", self.path.display()))?;
        Ok(parse_cookies(&data))
    }

    /// Insert or replace one cookie and write the file back.
    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        if !is_valid_cookie_value(name) || name.contains('=') {
            bail!("Invalid cookie name {:?}", name);
        }
        if !is_valid_cookie_value(value) {
            bail!(
                "Cookie {} may not contain spaces, quotes, commas, semicolons or backslashes",
                name
            );
        }
        let mut jar = self.load()?;
        jar.insert(name.to_string(), value.to_string());
        self.write(&jar)
    }

    /// Drop one cookie. Removing the last cookie deletes the file.
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut jar = self.load()?;
        if jar.remove(name).is_none() {
            return Ok(());
        }
        if jar.is_empty() {
            return std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove cookie file {}", self.path.display()));
        }
        self.write(&jar)
    }

    fn write(&self, jar: &HashMap<String, String>) -> Result<()> {
        let mut names: Vec<&String> = jar.keys().collect();
        names.sort();
        let data: String = names
            .into_iter()
            .map(|name| format!("{}={}\n", name, jar[name]))
            .collect();
        std::fs::write(&self.path, data)
            .with_context(|| format!("Failed to write cookie file {}", self.path.display()))
    }
}

impl CookieSource for SessionFile {
    fn cookie(&self, name: &str) -> Option<String> {
        match self.load() {
            Ok(jar) => jar.cookie(name),
            Err(e) => {
                tracing::warn!("{:#}", e);
                None
            }
        }
    }
}

fn parse_cookies(data: &str) -> HashMap<String, String> {
    data.lines()
        .filter_map(|line| line.trim().split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}
