//! Credential resolution for the Alphavantage adapter
//!
//! Three ordered sources, highest precedence first:
//! 1. `RequestEvent.api_key` - per-call override
//! 2. Client default key - supplied at construction
//! 3. Profile file `~/.alphavantage`, section `[access]`, key `api_key`
//!
//! Resolution happens per call. The profile file fails softly: a missing or
//! malformed file is treated as "no key from this source", and only when all
//! three sources are exhausted does resolution error. No environment
//! variables are read here; injecting a key from the environment is the
//! caller's concern.

use std::fs;
use std::path::PathBuf;

use crate::error::AdapterError;
use crate::types::RequestEvent;
use crate::PROFILE_FILE_NAME;

const PROFILE_SECTION: &str = "access";
const PROFILE_KEY: &str = "api_key";

/// Ordered API-key lookup over the three credential sources.
#[derive(Clone, Debug)]
pub struct CredentialResolver {
    profile_path: Option<PathBuf>,
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self {
            profile_path: dirs::home_dir().map(|home| home.join(PROFILE_FILE_NAME)),
        }
    }
}

impl CredentialResolver {
    /// Resolver backed by `~/.alphavantage`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver backed by a specific profile file instead of the home
    /// directory convention.
    pub fn with_profile_path(path: impl Into<PathBuf>) -> Self {
        Self {
            profile_path: Some(path.into()),
        }
    }

    /// Resolver that never consults a profile file.
    pub fn without_profile() -> Self {
        Self { profile_path: None }
    }

    /// Resolve the API key for one call.
    ///
    /// # Errors
    ///
    /// `AdapterError::MissingCredentials` when no source yields a non-empty key.
    pub fn resolve(
        &self,
        event: &RequestEvent,
        default_key: Option<&str>,
    ) -> Result<String, AdapterError> {
        if let Some(key) = non_empty(event.api_key.as_deref()) {
            return Ok(key.to_owned());
        }
        if let Some(key) = non_empty(default_key) {
            return Ok(key.to_owned());
        }
        if let Some(key) = self.profile_key() {
            return Ok(key);
        }
        Err(AdapterError::MissingCredentials)
    }

    /// Read `[access] api_key` from the profile file, treating any read or
    /// parse problem as absent.
    fn profile_key(&self) -> Option<String> {
        let path = self.profile_path.as_deref()?;
        let contents = fs::read_to_string(path).ok()?;
        parse_profile(&contents)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Minimal INI section scan: find `api_key = ...` inside `[access]`.
/// Lines starting with `#` or `;` are comments.
fn parse_profile(contents: &str) -> Option<String> {
    let mut in_section = false;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            in_section = name.trim().eq_ignore_ascii_case(PROFILE_SECTION);
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((name, value)) = line.split_once('=') {
            if name.trim() == PROFILE_KEY {
                return non_empty(Some(value)).map(str::to_owned);
            }
        }
    }
    None
}
