//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Scheduler cadence and auto-reset grace
//! - Default duration, colour and completion pattern for new timers
//! - Randomness seed for reproducible placement and jitter
//! - The premium flag read by the entitlement source
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use super::data_dir;
use crate::error::ConfigError;
use crate::haptics::HapticPattern;
use crate::timer::limits::{DEFAULT_COLOR_TAG, DEFAULT_TICK_INTERVAL, AUTO_RESET_GRACE};

/// Countdown-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_auto_reset_grace_ms")]
    pub auto_reset_grace_ms: u64,
    #[serde(default = "default_duration_secs")]
    pub default_duration_secs: u32,
    #[serde(default = "default_color")]
    pub default_color: String,
}

/// Haptic feedback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HapticsConfig {
    /// Pattern given to the completion point of new timers.
    #[serde(default)]
    pub completion_pattern: HapticPattern,
    /// Pattern given to points added without an explicit one.
    #[serde(default)]
    pub default_pattern: HapticPattern,
    /// Fixed seed for reproducible runs.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub haptics: HapticsConfig,
    /// Premium tier unlocked (more points, saved timers).
    #[serde(default)]
    pub premium: bool,
}

// Default functions
fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL.as_millis() as u64
}
fn default_auto_reset_grace_ms() -> u64 {
    AUTO_RESET_GRACE.as_millis() as u64
}
fn default_duration_secs() -> u32 {
    600
}
fn default_color() -> String {
    DEFAULT_COLOR_TAG.into()
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            auto_reset_grace_ms: default_auto_reset_grace_ms(),
            default_duration_secs: default_duration_secs(),
            default_color: default_color(),
        }
    }
}

impl Default for HapticsConfig {
    fn default() -> Self {
        Self {
            completion_pattern: HapticPattern::Pulse,
            default_pattern: HapticPattern::Pulse,
            rng_seed: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timer: TimerConfig::default(),
            haptics: HapticsConfig::default(),
            premium: false,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Replace the leaf at `key`, parsing `value` according to the type of
    /// the current leaf.
    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let (parent_path, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let parent = match parent_path {
            Some(path) => {
                let mut current = &mut *root;
                for part in path.split('.') {
                    current = current.get_mut(part).ok_or_else(unknown)?;
                }
                current
            }
            None => root,
        };
        let obj = parent.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        // Clearing writes null; deserialization rejects it for required fields.
        let new_value = match (existing, value) {
            (_, "" | "none" | "null") => serde_json::Value::Null,
            (serde_json::Value::Bool(_), _) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|e| invalid(e.to_string()))?,
            ),
            // Optional numbers (e.g. the seed) serialize as null until set.
            (serde_json::Value::Number(_) | serde_json::Value::Null, _) => value
                .parse::<u64>()
                .map(|n| serde_json::Value::Number(n.into()))
                .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
            (serde_json::Value::Object(_) | serde_json::Value::Array(_), _) => {
                serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
            }
            _ => serde_json::Value::String(value.into()),
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or create the default file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field (including unknown pattern names).
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a config value by key and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    /// For read-only commands that should work with a broken config file.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            warn!("using default configuration: {e}");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.timer.tick_interval_ms, 100);
        assert_eq!(parsed.timer.auto_reset_grace_ms, 1000);
        assert!(!parsed.premium);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let parsed: Config = toml::from_str("premium = true\n").unwrap();
        assert!(parsed.premium);
        assert_eq!(parsed.timer.default_color, "FF8C42");
        assert_eq!(parsed.haptics.completion_pattern, HapticPattern::Pulse);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.tick_interval_ms").as_deref(), Some("100"));
        assert_eq!(cfg.get("haptics.default_pattern").as_deref(), Some("pulse"));
        assert_eq!(cfg.get("premium").as_deref(), Some("false"));
        assert!(cfg.get("timer.missing_key").is_none());
    }

    #[test]
    fn apply_updates_typed_leaves() {
        let mut cfg = Config::default();
        cfg.apply("premium", "true").unwrap();
        cfg.apply("timer.tick_interval_ms", "50").unwrap();
        cfg.apply("haptics.completion_pattern", "heartbeat").unwrap();
        cfg.apply("haptics.rng_seed", "42").unwrap();
        assert!(cfg.premium);
        assert_eq!(cfg.timer.tick_interval_ms, 50);
        assert_eq!(cfg.haptics.completion_pattern, HapticPattern::Heartbeat);
        assert_eq!(cfg.haptics.rng_seed, Some(42));
        cfg.apply("haptics.rng_seed", "none").unwrap();
        assert_eq!(cfg.haptics.rng_seed, None);
    }

    #[test]
    fn apply_rejects_unknown_key_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(cfg.apply("timer.nope", "1"), Err(ConfigError::UnknownKey(_))));
        assert!(matches!(cfg.apply("premium", "maybe"), Err(ConfigError::InvalidValue { .. })));
        assert!(matches!(
            cfg.apply("haptics.default_pattern", "buzz"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(!cfg.premium);
        assert_eq!(cfg.haptics.default_pattern, HapticPattern::Pulse);
    }

    #[test]
    fn seed_can_be_cleared_after_being_set() {
        let mut cfg = Config::default();
        cfg.apply("haptics.rng_seed", "5").unwrap();
        assert_eq!(cfg.get("haptics.rng_seed").as_deref(), Some("5"));
        cfg.apply("haptics.rng_seed", "null").unwrap();
        assert_eq!(cfg.haptics.rng_seed, None);
        cfg.apply("haptics.rng_seed", "7").unwrap();
        cfg.apply("haptics.rng_seed", "").unwrap();
        assert_eq!(cfg.haptics.rng_seed, None);
    }

    #[test]
    fn clearing_a_required_field_is_rejected() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("timer.tick_interval_ms", "none"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(cfg.apply("premium", "null"), Err(ConfigError::InvalidValue { .. })));
        assert_eq!(cfg.timer.tick_interval_ms, 100);
    }
}
