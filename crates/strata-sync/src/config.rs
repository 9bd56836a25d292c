//! Sync configuration.
//!
//! Reconciliation is governed by four externally supplied settings: the
//! tri-state sync mode, the no-delete guard, an exclusion list of connection
//! and table names, and a debug toggle for verbose SQL tracing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, SyncError};

/// Environment variable holding the sync mode.
pub const ENV_MODE: &str = "STRATA_SCHEMA_SYNC";
/// Environment variable holding the no-delete guard.
pub const ENV_NO_DELETE: &str = "STRATA_NO_DELETE";
/// Environment variable holding the exclusion list.
pub const ENV_EXCLUDE: &str = "STRATA_SCHEMA_EXCLUDE";
/// Environment variable holding the debug toggle.
pub const ENV_DEBUG: &str = "STRATA_DEBUG";

/// What reconciliation does with the changes it finds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Skip reconciliation entirely.
    #[default]
    Off,
    /// Log every statement for manual review without executing it.
    LogOnly,
    /// Execute every statement.
    Apply,
}

impl SyncMode {
    /// Parses an optional setting. Unset and blank values mean [`SyncMode::Off`].
    pub fn from_setting(value: Option<&str>) -> Result<Self> {
        value.map_or(Ok(Self::Off), str::parse)
    }

    /// Returns `true` unless the mode is [`SyncMode::Off`].
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::Off)
    }
}

impl FromStr for SyncMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim().to_ascii_lowercase();
        match value.as_str() {
            "" | "skip" | "disabled" => Ok(Self::Off),
            "false" | "0" | "no" | "off" | "log" | "log-only" | "logonly" => Ok(Self::LogOnly),
            "true" | "1" | "yes" | "on" | "apply" => Ok(Self::Apply),
            _ => Err(SyncError::Config(format!("unrecognised sync mode `{}`", s.trim()))),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::LogOnly => "log-only",
            Self::Apply => "apply",
        })
    }
}

impl<'de> Deserialize<'de> for SyncMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Self::from_setting(value.as_deref()).map_err(serde::de::Error::custom)
    }
}

/// Settings read at diff time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub mode: SyncMode,
    /// Withhold destructive statements and log them for manual execution.
    pub no_delete: bool,
    /// Connection and table names to skip, matched case-insensitively.
    #[serde(deserialize_with = "deserialize_exclude")]
    pub exclude: Vec<String>,
    /// Trace every rendered statement and diff.
    pub debug: bool,
}

impl SyncConfig {
    /// Creates a configuration with the given mode and every guard off.
    #[must_use]
    pub fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps an environment
    /// variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            mode: SyncMode::from_setting(lookup(ENV_MODE).as_deref())?,
            no_delete: parse_flag(ENV_NO_DELETE, lookup(ENV_NO_DELETE).as_deref())?,
            exclude: lookup(ENV_EXCLUDE)
                .map(|value| parse_exclude(&value))
                .unwrap_or_default(),
            debug: parse_flag(ENV_DEBUG, lookup(ENV_DEBUG).as_deref())?,
        })
    }

    /// Sets the no-delete guard.
    #[must_use]
    pub const fn no_delete(mut self, enabled: bool) -> Self {
        self.no_delete = enabled;
        self
    }

    /// Adds names to the exclusion list.
    #[must_use]
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(names.into_iter().map(Into::into));
        self
    }

    /// Sets the debug toggle.
    #[must_use]
    pub const fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Returns `true` if `name` is on the exclusion list.
    #[must_use]
    pub fn is_excluded(&self, name: &str) -> bool {
        let name = name.trim();
        self.exclude.iter().any(|e| e.eq_ignore_ascii_case(name))
    }
}

/// Splits a comma or semicolon separated list, trimming entries and dropping
/// empty ones.
#[must_use]
pub fn parse_exclude(value: &str) -> Vec<String> {
    value
        .split([',', ';'])
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(key: &str, value: Option<&str>) -> Result<bool> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "no" | "off" => Ok(false),
        "true" | "1" | "yes" | "on" => Ok(true),
        other => Err(SyncError::Config(format!("{key} must be a boolean, got `{other}`"))),
    }
}

fn deserialize_exclude<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Names {
        Joined(String),
        List(Vec<String>),
    }

    Ok(match Names::deserialize(deserializer)? {
        Names::Joined(value) => parse_exclude(&value),
        Names::List(names) => names
            .iter()
            .flat_map(|name| parse_exclude(name))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn mode_is_tri_state() {
        assert_eq!(SyncMode::from_setting(None).unwrap(), SyncMode::Off);
        assert_eq!(SyncMode::from_setting(Some("  ")).unwrap(), SyncMode::Off);
        for value in ["false", "0", "No", "off"] {
            assert_eq!(value.parse::<SyncMode>().unwrap(), SyncMode::LogOnly, "{value}");
        }
        for value in ["true", "1", "YES", "on", "apply"] {
            assert_eq!(value.parse::<SyncMode>().unwrap(), SyncMode::Apply, "{value}");
        }
        assert!(matches!("maybe".parse::<SyncMode>(), Err(SyncError::Config(_))));
    }

    #[test]
    fn reads_every_setting() {
        let config = SyncConfig::from_lookup(lookup(&[
            (ENV_MODE, "true"),
            (ENV_NO_DELETE, "1"),
            (ENV_EXCLUDE, " Audit ;Logs,, main "),
            (ENV_DEBUG, "yes"),
        ]))
        .unwrap();
        assert_eq!(config.mode, SyncMode::Apply);
        assert!(config.no_delete);
        assert_eq!(config.exclude, ["Audit", "Logs", "main"]);
        assert!(config.debug);
    }

    #[test]
    fn empty_environment_is_off() {
        assert_eq!(SyncConfig::from_lookup(lookup(&[])).unwrap(), SyncConfig::default());
    }

    #[test]
    fn bad_flags_are_errors() {
        assert!(SyncConfig::from_lookup(lookup(&[(ENV_NO_DELETE, "sometimes")])).is_err());
    }

    #[test]
    fn exclusion_ignores_case() {
        let config = SyncConfig::new(SyncMode::Apply).exclude(["Audit"]);
        assert!(config.is_excluded("AUDIT"));
        assert!(config.is_excluded(" audit "));
        assert!(!config.is_excluded("Auditor"));
    }

    #[test]
    fn deserializes_from_json() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"mode": "false", "exclude": "a; b", "no_delete": true}"#)
                .unwrap();
        assert_eq!(config.mode, SyncMode::LogOnly);
        assert_eq!(config.exclude, ["a", "b"]);
        assert!(config.no_delete);
        assert!(!config.debug);

        let config: SyncConfig = serde_json::from_str(r#"{"exclude": ["x", "y,z"]}"#).unwrap();
        assert_eq!(config.mode, SyncMode::Off);
        assert_eq!(config.exclude, ["x", "y", "z"]);
    }
}
