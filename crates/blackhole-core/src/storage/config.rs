//! TOML-based timer configuration.
//!
//! Holds interval lengths and behavior flags:
//! - Work, short break and long break durations (minutes, up to 2 decimals)
//! - How many focus sessions precede a long break
//! - Auto-start chaining flags
//! - Sound mode and clock display preference
//!
//! The configuration is stored as TOML under the `settings` key of the
//! persistence adapter. It is replaced as a whole, never patched in place.

use serde::{Deserialize, Serialize};

use super::KvStore;
use crate::error::{ConfigError, ValidationError};
use crate::timer::{Phase, SoundMode};

/// Storage key for the configuration.
pub const SETTINGS_KEY: &str = "settings";

/// Upper bound for any phase duration, in minutes.
pub const MAX_MINUTES: f64 = 999.0;
pub const MAX_SESSIONS_BEFORE_LONG: u32 = 99;

/// Timer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: f64,
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: f64,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: f64,
    #[serde(default = "default_sessions_before_long")]
    pub sessions_before_long: u32,
    /// Start every next phase automatically.
    #[serde(default)]
    pub auto_start_next: bool,
    /// Start the focus phase automatically once a break ends.
    #[serde(default)]
    pub auto_continue_after_break: bool,
    #[serde(default)]
    pub sound_mode: SoundMode,
    /// Zero-pad minutes in the clock display.
    #[serde(default = "default_true")]
    pub leading_zero: bool,
}

// Default functions
fn default_work_minutes() -> f64 {
    25.0
}
fn default_short_break_minutes() -> f64 {
    5.0
}
fn default_long_break_minutes() -> f64 {
    15.0
}
fn default_sessions_before_long() -> u32 {
    4
}
fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            sessions_before_long: default_sessions_before_long(),
            auto_start_next: false,
            auto_continue_after_break: false,
            sound_mode: SoundMode::Default,
            leading_zero: true,
        }
    }
}

impl Config {
    pub fn minutes(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Work => self.work_minutes,
            Phase::ShortBreak => self.short_break_minutes,
            Phase::LongBreak => self.long_break_minutes,
        }
    }

    /// Length of `phase` in whole seconds, never less than one.
    pub fn duration_secs(&self, phase: Phase) -> u64 {
        let secs = (self.minutes(phase) * 60.0).round();
        if secs.is_finite() && secs >= 1.0 {
            secs as u64
        } else {
            1
        }
    }

    /// Whether the phase following `prev` starts without user action.
    pub fn auto_starts_after(&self, prev: Phase) -> bool {
        self.auto_start_next || (self.auto_continue_after_break && prev.is_break())
    }

    /// Check every field; the error names the first offending one.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_minutes("work_minutes", self.work_minutes)?;
        validate_minutes("short_break_minutes", self.short_break_minutes)?;
        validate_minutes("long_break_minutes", self.long_break_minutes)?;
        if !(1..=MAX_SESSIONS_BEFORE_LONG).contains(&self.sessions_before_long) {
            return Err(ValidationError::invalid(
                "sessions_before_long",
                format!("must be between 1 and {MAX_SESSIONS_BEFORE_LONG}"),
            ));
        }
        Ok(())
    }

    /// Load from the store, falling back to defaults when the stored value is
    /// missing, unreadable or invalid.
    pub fn load<S: KvStore + ?Sized>(store: &S) -> Self {
        let raw = match store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "settings unreadable, using defaults");
                return Self::default();
            }
        };
        match toml::from_str::<Config>(&raw) {
            Ok(cfg) => match cfg.validate() {
                Ok(()) => cfg,
                Err(e) => {
                    tracing::warn!(error = %e, "stored settings invalid, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "stored settings corrupt, using defaults");
                Self::default()
            }
        }
    }

    /// Persist to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save<S: KvStore + ?Sized>(&self, store: &S) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        store.set(SETTINGS_KEY, &content)?;
        Ok(())
    }

    /// Get a config value as string by key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Copy of this config with `key` set to `value`. The result is not
    /// validated; apply it through the controller.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse for
    /// the key's type.
    pub fn with_value(&self, key: &str, value: &str) -> Result<Config, ConfigError> {
        let parse_failed = || ConfigError::ParseFailed {
            key: key.to_string(),
            value: value.to_string(),
        };
        let mut json = serde_json::to_value(self).map_err(|_| parse_failed())?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        serde_json::from_value(json).map_err(|_| parse_failed())
    }

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

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let parse_failed = || ConfigError::ParseFailed {
            key: key.to_string(),
            value: value.to_string(),
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => {
                        serde_json::Value::Bool(value.parse::<bool>().map_err(|_| parse_failed())?)
                    }
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(parse_failed)?
                        } else {
                            return Err(parse_failed());
                        }
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }
}

fn validate_minutes(field: &str, minutes: f64) -> Result<(), ValidationError> {
    if !minutes.is_finite() {
        return Err(ValidationError::invalid(field, "must be a finite number"));
    }
    if minutes <= 0.0 || minutes > MAX_MINUTES {
        return Err(ValidationError::invalid(
            field,
            format!("must be greater than 0 and at most {MAX_MINUTES}"),
        ));
    }
    if (minutes * 100.0).round() / 100.0 != minutes {
        return Err(ValidationError::invalid(
            field,
            "must have at most 2 decimal places",
        ));
    }
    Ok(())
}
