//! Configuration management
//!
//! `settings.json` in the data directory:
//! ```json
//! {
//!   "reps": { "Uriel": ["Mega Save Chatsworth", "Spar Chatsworth"] },
//!   "focusLines": ["Breast Fillet 2kg"],
//!   "reportTransactionType": "INV",
//!   "notification": { "gatewayUrl": "https://...", "defaults": { "provider": "twilio", ... } },
//!   "server": { "bind": "127.0.0.1:8000" }
//! }
//! ```
//!
//! Environment overrides: `SALESDASH_BIND`, `SALESDASH_SMS_GATEWAY_URL`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::NotificationConfig;

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_TRANSACTION_TYPE: &str = "INV";

pub const ENV_BIND: &str = "SALESDASH_BIND";
pub const ENV_GATEWAY_URL: &str = "SALESDASH_SMS_GATEWAY_URL";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reps: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    focus_lines: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    report_transaction_type: Option<String>,
    #[serde(default)]
    notification: NotificationSettings,
    #[serde(default)]
    server: ServerSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gateway_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    defaults: Option<NotificationConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bind: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Sales rep territories used when none are configured
pub fn default_reps() -> BTreeMap<String, Vec<String>> {
    let mut reps = BTreeMap::new();
    reps.insert(
        "Uriel".to_string(),
        vec!["Mega Save Chatsworth".to_string(), "Spar Chatsworth".to_string()],
    );
    reps.insert(
        "Lyle".to_string(),
        vec!["Pick n Pay Westwood".to_string(), "Pick n Pay Pavilion".to_string()],
    );
    reps.insert(
        "Calvyn".to_string(),
        vec!["Dermott Distribution".to_string(), "T&P Chats".to_string()],
    );
    reps
}

/// Salesdash configuration (resolved view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    /// Rep name to the customers they cover
    pub reps: BTreeMap<String, Vec<String>>,
    /// Products highlighted in reports; empty means the heaviest sellers
    pub focus_lines: Vec<String>,
    /// Only rows of this transaction type count towards reports
    pub report_transaction_type: Option<String>,
    pub gateway_url: Option<String>,
    pub notification_defaults: Option<NotificationConfig>,
    pub bind: String,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_raw(SettingsFile::default())
    }
}

impl Config {
    /// Load config from the data directory, then apply environment overrides
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join(SETTINGS_FILE);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %settings_path.display(), error = %e, "Ignoring unreadable settings file");
                SettingsFile::default()
            })
        } else {
            SettingsFile::default()
        };

        let mut config = Self::from_raw(raw);
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_raw(raw: SettingsFile) -> Self {
        let report_transaction_type = match &raw.report_transaction_type {
            None => Some(DEFAULT_TRANSACTION_TYPE.to_string()),
            Some(t) if t.trim().is_empty() => None,
            Some(t) => Some(t.trim().to_string()),
        };

        Self {
            reps: raw.reps.clone().unwrap_or_else(default_reps),
            focus_lines: raw
                .focus_lines
                .iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
            report_transaction_type,
            gateway_url: raw.notification.gateway_url.clone().filter(|u| !u.trim().is_empty()),
            notification_defaults: raw.notification.defaults.clone(),
            bind: raw
                .server
                .bind
                .clone()
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            _raw_settings: raw,
        }
    }

    /// Apply overrides from an environment-like lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(ENV_BIND).filter(|v| !v.trim().is_empty()) {
            self.bind = bind.trim().to_string();
        }
        if let Some(url) = lookup(ENV_GATEWAY_URL).filter(|v| !v.trim().is_empty()) {
            self.gateway_url = Some(url.trim().to_string());
        }
    }

    /// Save config to the data directory
    /// Preserves other settings that salesdash doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join(SETTINGS_FILE);

        // Load existing settings to preserve fields we don't manage
        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            self._raw_settings.clone()
        };

        settings.reps = Some(self.reps.clone());
        settings.focus_lines = self.focus_lines.clone();
        settings.report_transaction_type =
            Some(self.report_transaction_type.clone().unwrap_or_default());
        settings.notification.defaults = self.notification_defaults.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Rep names with the catch-all "All" appended
    pub fn rep_options(&self) -> Vec<String> {
        let mut names: Vec<String> = self.reps.keys().cloned().collect();
        names.push("All".to_string());
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();

        assert_eq!(config.reps.len(), 3);
        assert_eq!(config.reps["Lyle"][0], "Pick n Pay Westwood");
        assert_eq!(config.report_transaction_type.as_deref(), Some("INV"));
        assert!(config.focus_lines.is_empty());
        assert_eq!(config.rep_options().last().map(String::as_str), Some("All"));
    }

    #[test]
    fn test_reads_camel_case_settings() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{
                "reps": {"Ann": ["Spar Umhlanga"]},
                "focusLines": ["Wings 1kg", " "],
                "reportTransactionType": "",
                "notification": {"gatewayUrl": "http://localhost:9000/sms"},
                "server": {"bind": "0.0.0.0:9999"},
                "theme": "dark"
            }"#,
        )
        .unwrap();

        let mut config = Config::from_raw(
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap())
                .unwrap(),
        );
        assert_eq!(config.reps.keys().collect::<Vec<_>>(), vec!["Ann"]);
        assert_eq!(config.focus_lines, vec!["Wings 1kg"]);
        assert_eq!(config.report_transaction_type, None);
        assert_eq!(config.gateway_url.as_deref(), Some("http://localhost:9000/sms"));
        assert_eq!(config.bind, "0.0.0.0:9999");

        // Unmanaged keys survive a save
        config.focus_lines.push("Thighs".to_string());
        config.save(dir.path()).unwrap();
        let saved = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        assert!(saved.contains("\"theme\": \"dark\""));
        assert!(saved.contains("Thighs"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            ENV_BIND => Some("0.0.0.0:8080".to_string()),
            ENV_GATEWAY_URL => Some(" https://gw.example/sms ".to_string()),
            _ => None,
        });
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.gateway_url.as_deref(), Some("https://gw.example/sms"));
    }
}
