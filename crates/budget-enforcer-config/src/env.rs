// crates/budget-enforcer-config/src/env.rs
// ============================================================================
// Module: Environment Source
// Description: Environment lookups with an optional override map.
// Purpose: Keep configuration loading deterministic under test.
// Dependencies: dotenvy
// ============================================================================

//! ## Overview
//! [`EnvSource`] reads process environment variables, or an explicit map when
//! one is supplied. A `.env` file can be layered underneath; its entries only
//! fill keys the primary source leaves unset. Values are trimmed and blank
//! values count as unset. Oversized values are rejected rather than truncated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ConfigError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum bytes accepted for a single environment value.
pub const MAX_ENV_VALUE_BYTES: usize = 4096;
/// Dotenv file read from the working directory by the CLI.
pub const DEFAULT_DOTENV_NAME: &str = ".env";

// ============================================================================
// SECTION: Source
// ============================================================================

/// Environment variable source; the default reads the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSource {
    /// Optional override map used for deterministic lookups.
    overrides: Option<BTreeMap<String, String>>,
    /// Dotenv entries consulted only when the primary source has no value.
    dotenv: BTreeMap<String, String>,
}

impl EnvSource {
    /// Reads from the process environment.
    #[must_use]
    pub const fn process() -> Self {
        Self {
            overrides: None,
            dotenv: BTreeMap::new(),
        }
    }

    /// Reads from an empty map; every key is unset.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            overrides: Some(BTreeMap::new()),
            dotenv: BTreeMap::new(),
        }
    }

    /// Reads only from the given key/value pairs.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            overrides: Some(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
            dotenv: BTreeMap::new(),
        }
    }

    /// Layers the dotenv file at `path` beneath this source.
    ///
    /// A missing file is not an error. Entries never override a key the
    /// primary source already defines, and the process environment is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file exists but cannot be read,
    /// or [`ConfigError::Parse`] when a line is malformed.
    pub fn with_dotenv(mut self, path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Ok(self);
        }
        let entries = dotenvy::from_path_iter(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        for entry in entries {
            let (key, value) = entry
                .map_err(|err| ConfigError::Parse(format!("{}: {err}", path.display())))?;
            self.dotenv.insert(key, value);
        }
        Ok(self)
    }

    /// Returns the trimmed value for `key`, or `None` when unset or blank.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value exceeds
    /// [`MAX_ENV_VALUE_BYTES`] or is not valid unicode.
    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let raw = match &self.overrides {
            Some(map) => map.get(key).cloned(),
            None => match std::env::var(key) {
                Ok(value) => Some(value),
                Err(std::env::VarError::NotPresent) => None,
                Err(std::env::VarError::NotUnicode(_)) => {
                    return Err(ConfigError::Invalid(format!("{key} must be valid unicode")));
                }
            },
        };
        let Some(raw) = raw.or_else(|| self.dotenv.get(key).cloned()) else {
            return Ok(None);
        };
        if raw.len() > MAX_ENV_VALUE_BYTES {
            return Err(ConfigError::Invalid(format!("{key} exceeds {MAX_ENV_VALUE_BYTES} bytes")));
        }
        let trimmed = raw.trim();
        Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
    }

    /// Parses the value for `key` with [`str::parse`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value does not parse.
    pub fn parse<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.get(key)?
            .map(|value| {
                value
                    .parse::<T>()
                    .map_err(|_| ConfigError::Invalid(format!("{key} has invalid value '{value}'")))
            })
            .transpose()
    }
}
