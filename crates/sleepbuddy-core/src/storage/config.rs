//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Afternoon reminder time and stop-tracking grace period
//! - Notification delivery (enabled flag, external notifier command)
//! - Daemon reconcile interval
//!
//! Configuration is stored at `~/.config/sleepbuddy/config.toml`.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::goal::parse_time_of_day;
use crate::scheduler::SchedulerConfig;

/// Reminder cascade configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemindersConfig {
    /// `HH:MM` of the afternoon reminder.
    #[serde(default = "default_daily_time")]
    pub daily_time: String,
    #[serde(default = "default_stop_grace_minutes")]
    pub stop_grace_minutes: u32,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// External notifier, e.g. `notify-send`. Empty logs instead.
    #[serde(default)]
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Seconds between reconcile passes (goal reload, overdue delivery).
    #[serde(default = "default_reconcile_secs")]
    pub reconcile_secs: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/sleepbuddy/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reminders: RemindersConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
}

fn default_daily_time() -> String {
    "15:00".into()
}
fn default_stop_grace_minutes() -> u32 {
    15
}
fn default_true() -> bool {
    true
}
fn default_reconcile_secs() -> u64 {
    60
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            daily_time: default_daily_time(),
            stop_grace_minutes: default_stop_grace_minutes(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: String::new(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            reconcile_secs: default_reconcile_secs(),
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
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) => return Err(unknown()),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location under the data directory.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Every leaf key with its value, in dotted form.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }
        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Set a value in memory by dotted key, rejecting unknown keys and
    /// values that fail validation.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a value by key and persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_time_of_day(&self.reminders.daily_time).map_err(|e| ConfigError::InvalidValue {
            key: "reminders.daily_time".into(),
            message: e.to_string(),
        })?;
        if self.daemon.reconcile_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "daemon.reconcile_secs".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Reminder tunables derived from this config.
    pub fn scheduler_config(&self) -> Result<SchedulerConfig, ConfigError> {
        let daily_reminder =
            parse_time_of_day(&self.reminders.daily_time).map_err(|e| ConfigError::InvalidValue {
                key: "reminders.daily_time".into(),
                message: e.to_string(),
            })?;
        Ok(SchedulerConfig {
            daily_reminder,
            stop_grace: Duration::minutes(i64::from(self.reminders.stop_grace_minutes)),
            ..SchedulerConfig::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[reminders]\ndaily_time = \"14:30\"\n").unwrap();
        assert_eq!(parsed.reminders.daily_time, "14:30");
        assert_eq!(parsed.reminders.stop_grace_minutes, 15);
        assert!(parsed.notifications.enabled);
        assert_eq!(parsed.daemon.reconcile_secs, 60);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("reminders.daily_time").as_deref(), Some("15:00"));
        assert_eq!(cfg.get("notifications.enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("daemon.reconcile_secs").as_deref(), Some("60"));
        assert!(cfg.get("reminders.missing_key").is_none());
        assert!(cfg.get("reminders").is_none());
    }

    #[test]
    fn set_value_updates_each_type() {
        let mut cfg = Config::default();
        cfg.set_value("notifications.enabled", "false").unwrap();
        cfg.set_value("reminders.stop_grace_minutes", "30").unwrap();
        cfg.set_value("notifications.command", "notify-send -u critical").unwrap();
        assert!(!cfg.notifications.enabled);
        assert_eq!(cfg.reminders.stop_grace_minutes, 30);
        assert_eq!(cfg.notifications.command, "notify-send -u critical");
    }

    #[test]
    fn set_value_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set_value("reminders.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.set_value("", "1"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_value_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set_value("notifications.enabled", "sometimes").is_err());
        assert!(cfg.set_value("reminders.stop_grace_minutes", "-5").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn set_value_rejects_bad_time_and_keeps_old_value() {
        let mut cfg = Config::default();
        assert!(cfg.set_value("reminders.daily_time", "25:99").is_err());
        assert_eq!(cfg.reminders.daily_time, "15:00");
    }

    #[test]
    fn entries_lists_every_leaf() {
        let keys: Vec<String> = Config::default().entries().into_iter().map(|(k, _)| k).collect();
        for key in [
            "reminders.daily_time",
            "reminders.stop_grace_minutes",
            "notifications.enabled",
            "notifications.command",
            "daemon.reconcile_secs",
        ] {
            assert!(keys.iter().any(|k| k == key), "missing {key}");
        }
    }

    #[test]
    fn scheduler_config_uses_configured_values() {
        let mut cfg = Config::default();
        cfg.set_value("reminders.daily_time", "16:45").unwrap();
        cfg.set_value("reminders.stop_grace_minutes", "20").unwrap();
        let sched = cfg.scheduler_config().unwrap();
        assert_eq!(sched.daily_reminder, NaiveTime::from_hms_opt(16, 45, 0).unwrap());
        assert_eq!(sched.stop_grace, Duration::minutes(20));
        assert_eq!(sched.post_sleep_neutral_after, Duration::hours(2));
    }

    #[test]
    fn load_from_writes_defaults_on_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut cfg = cfg;
        cfg.set_value("daemon.reconcile_secs", "5").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().daemon.reconcile_secs, 5);
    }

    #[test]
    fn load_from_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "reminders = 3").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::LoadFailed { .. })));
    }
}
