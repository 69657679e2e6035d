//! Persisted dashboard settings.
//!
//! The on-disk shape has changed over time. Older files are upgraded by
//! [`migrate`] when they are loaded, so the rest of the crate only ever sees
//! the current [`Settings`] shape.

use std::fmt;
use std::path::Path;

use clap::ValueEnum;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::auth::Token;
use crate::error::{Result, TestLensError};

pub const CURRENT_VERSION: u64 = 2;
pub const DEFAULT_BASE_URL: &str = "https://dev.azure.com";
pub const DEFAULT_SETTINGS_FILE: &str = "testlens.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceMode {
    /// Synthetic data, no network access
    #[default]
    Demo,
    /// Pipelines → test runs
    Pipelines,
    /// Test plans → test runs
    Testplans,
}

impl fmt::Display for DataSourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Demo => "demo",
            Self::Pipelines => "pipelines",
            Self::Testplans => "testplans",
        };
        f.write_str(name)
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureSettings {
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub personal_access_token: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            organization: String::new(),
            personal_access_token: String::new(),
            base_url: default_base_url(),
        }
    }
}

impl fmt::Debug for AzureSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureSettings")
            .field("organization", &self.organization)
            .field("personal_access_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AzureSettings {
    pub fn token(&self) -> Token {
        Token::from(self.personal_access_token.as_str())
    }

    pub fn ensure_configured(&self) -> Result<()> {
        if self.organization.trim().is_empty() {
            return Err(TestLensError::Config(
                "Azure DevOps organization is not set".to_string(),
            ));
        }
        if self.personal_access_token.trim().is_empty() {
            return Err(TestLensError::Config(
                "Azure DevOps personal access token is not set".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectToggle {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub version: u64,
    #[serde(default)]
    pub azure: AzureSettings,
    #[serde(default)]
    pub projects: Vec<ProjectToggle>,
    #[serde(default)]
    pub data_source: DataSourceMode,
    #[serde(default = "default_environments")]
    pub environments: Vec<String>,
    #[serde(default = "default_environment")]
    pub default_environment: String,
}

fn default_environments() -> Vec<String> {
    ["QA", "Stage", "UAT", "Prod"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_environment() -> String {
    "QA".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            azure: AzureSettings::default(),
            projects: Vec::new(),
            data_source: DataSourceMode::default(),
            environments: default_environments(),
            default_environment: default_environment(),
        }
    }
}

/// Version 1 layout: flat credentials and a plain list of project names.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacySettings {
    #[serde(default)]
    organization: String,
    #[serde(default)]
    personal_access_token: String,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    projects: Vec<String>,
    #[serde(default)]
    data_source: Option<DataSourceMode>,
    #[serde(default)]
    environment: Option<String>,
}

impl From<LegacySettings> for Settings {
    fn from(legacy: LegacySettings) -> Self {
        let base_url = legacy
            .base_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(default_base_url);

        Self {
            version: CURRENT_VERSION,
            azure: AzureSettings {
                organization: legacy.organization,
                personal_access_token: legacy.personal_access_token,
                base_url,
            },
            projects: legacy
                .projects
                .into_iter()
                .map(|name| ProjectToggle {
                    name,
                    enabled: true,
                })
                .collect(),
            data_source: legacy.data_source.unwrap_or_default(),
            environments: default_environments(),
            default_environment: legacy.environment.unwrap_or_else(default_environment),
        }
    }
}

/// Upgrades a raw settings document of any known version to [`Settings`].
///
/// Documents without a `version` key are treated as version 1.
///
/// # Errors
/// Returns [`TestLensError::Config`] for unknown versions or invalid values
/// and [`TestLensError::Json`] when the document does not match its version.
pub fn migrate(value: Value) -> Result<Settings> {
    let version = match value.get("version") {
        None => 1,
        Some(v) => v.as_u64().ok_or_else(|| {
            TestLensError::Config(format!("Settings version must be a number, got {v}"))
        })?,
    };

    let settings = match version {
        1 => {
            debug!("Migrating settings from version 1 to {CURRENT_VERSION}");
            Settings::from(serde_json::from_value::<LegacySettings>(value)?)
        }
        CURRENT_VERSION => serde_json::from_value::<Settings>(value)?,
        other => {
            return Err(TestLensError::Config(format!(
                "Unsupported settings version {other} (latest is {CURRENT_VERSION})"
            )))
        }
    };

    settings.validate()?;
    Ok(settings)
}

impl Settings {
    /// Loads settings from `path`, returning defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(
                "Settings file {} not found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&raw)?;
        migrate(value)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Settings written to: {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.azure.base_url).map_err(|e| {
            TestLensError::Config(format!("Invalid base URL '{}': {e}", self.azure.base_url))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(TestLensError::Config(format!(
                "Base URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.projects.iter().any(|p| p.name.trim().is_empty()) {
            return Err(TestLensError::Config(
                "Project names must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn enabled_projects(&self) -> Vec<String> {
        self.projects
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_migrate_legacy_settings() {
        let legacy = json!({
            "organization": "contoso",
            "personalAccessToken": "pat-123",
            "baseUrl": "https://azure.contoso.local",
            "projects": ["Payments", "Portal"],
            "dataSource": "pipelines",
            "environment": "UAT"
        });

        let settings = migrate(legacy).unwrap();

        assert_eq!(settings.version, CURRENT_VERSION);
        assert_eq!(settings.azure.organization, "contoso");
        assert_eq!(settings.azure.personal_access_token, "pat-123");
        assert_eq!(settings.azure.base_url, "https://azure.contoso.local");
        assert_eq!(settings.enabled_projects(), vec!["Payments", "Portal"]);
        assert_eq!(settings.data_source, DataSourceMode::Pipelines);
        assert_eq!(settings.default_environment, "UAT");
    }

    #[test]
    fn test_migrate_legacy_settings_fills_defaults() {
        let settings = migrate(json!({ "organization": "contoso" })).unwrap();

        assert_eq!(settings.azure.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.data_source, DataSourceMode::Demo);
        assert_eq!(settings.environments.len(), 4);
        assert!(settings.azure.ensure_configured().is_err());
    }

    #[test]
    fn test_current_settings_pass_through() {
        let current = json!({
            "version": 2,
            "azure": {
                "organization": "contoso",
                "personalAccessToken": "pat",
                "baseUrl": "https://dev.azure.com"
            },
            "projects": [
                { "name": "Payments", "enabled": true },
                { "name": "Legacy", "enabled": false },
                { "name": "Portal" }
            ],
            "dataSource": "testplans",
            "environments": ["QA", "Prod"],
            "defaultEnvironment": "Prod"
        });

        let settings = migrate(current).unwrap();

        assert_eq!(settings.enabled_projects(), vec!["Payments", "Portal"]);
        assert_eq!(settings.data_source, DataSourceMode::Testplans);
        assert_eq!(settings.default_environment, "Prod");
        assert!(settings.azure.ensure_configured().is_ok());
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let err = migrate(json!({ "version": 9 })).unwrap_err();

        assert!(err.is_config());
        assert!(err.to_string().contains("Unsupported settings version 9"));
    }

    #[test]
    fn test_non_numeric_version_is_rejected() {
        let err = migrate(json!({ "version": "two" })).unwrap_err();

        assert!(err.is_config());
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let err = migrate(json!({ "organization": "x", "baseUrl": "not a url" })).unwrap_err();

        assert!(err.is_config());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_SETTINGS_FILE);

        let settings = Settings::load(&path).unwrap();

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_then_load_keeps_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_SETTINGS_FILE);
        let mut settings = Settings::default();
        settings.azure.organization = "contoso".to_string();
        settings.projects.push(ProjectToggle {
            name: "Payments".to_string(),
            enabled: true,
        });

        settings.save(&path).unwrap();
        let loaded = Settings::load(&path).unwrap();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_ensure_configured_reports_missing_token() {
        let azure = AzureSettings {
            organization: "contoso".to_string(),
            ..AzureSettings::default()
        };

        let err = azure.ensure_configured().unwrap_err();

        assert!(err.to_string().contains("personal access token"));
    }

    #[test]
    fn test_azure_settings_debug_redacts_token() {
        let azure = AzureSettings {
            organization: "contoso".to_string(),
            personal_access_token: "very-secret-pat".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        };

        let debug_output = format!("{azure:?}");

        assert!(debug_output.contains("contoso"));
        assert!(!debug_output.contains("very-secret-pat"));
    }
}
