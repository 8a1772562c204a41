use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Compiled-in API location; runtime settings may override it.
pub const DEFAULT_API_BASE_URL: &str = match option_env!("BACKOFFICE_API_URL") {
    Some(url) => url,
    None => "http://localhost:3000/api",
};

pub const DEFAULT_SETTINGS_FILE: &str = "backoffice.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse settings file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid api base url '{url}': {source}")]
    InvalidBaseUrl { url: String, source: url::ParseError },
    #[error("api base url '{0}' cannot carry path segments")]
    OpaqueBaseUrl(String),
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub default_page_size: u32,
    pub fallback_error_message: String,
    /// Backend field key -> display label, applied to every surfaced error.
    pub field_labels: BTreeMap<String, String>,
    /// Per-screen quiet interval overrides keyed by resource path.
    pub search_debounce_ms: BTreeMap<String, u64>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            request_timeout_secs: 30,
            default_page_size: 10,
            fallback_error_message: "An unexpected error occurred. Please try again.".into(),
            field_labels: default_field_labels(),
            search_debounce_ms: BTreeMap::new(),
        }
    }
}

fn default_field_labels() -> BTreeMap<String, String> {
    [
        ("identification", "Identification number"),
        ("identificationType", "Identification type"),
        ("email", "Email address"),
        ("phone", "Phone number"),
        ("plate", "License plate"),
        ("licenseNumber", "License number"),
        ("vehicleType", "Vehicle type"),
        ("depotType", "Depot type"),
        ("companyId", "Company"),
        ("ownerId", "Owner"),
        ("driverId", "Driver"),
        ("routeId", "Route"),
        ("weightKg", "Weight (kg)"),
        ("pickupDate", "Pickup date"),
    ]
    .into_iter()
    .map(|(key, label)| (key.to_string(), label.to_string()))
    .collect()
}

impl ClientSettings {
    pub fn api_base_url(&self) -> Result<Url, SettingsError> {
        let url = Url::parse(self.api_base_url.trim()).map_err(|source| {
            SettingsError::InvalidBaseUrl {
                url: self.api_base_url.clone(),
                source,
            }
        })?;
        if url.cannot_be_a_base() {
            return Err(SettingsError::OpaqueBaseUrl(self.api_base_url.clone()));
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn search_debounce(&self, resource_path: &str, fallback: Duration) -> Duration {
        self.search_debounce_ms
            .get(resource_path)
            .map_or(fallback, |ms| Duration::from_millis(*ms))
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.api_base_url()?;
        if self.default_page_size == 0 {
            return Err(SettingsError::InvalidValue {
                key: "default_page_size",
                value: self.default_page_size.to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(SettingsError::InvalidValue {
                key: "request_timeout_secs",
                value: self.request_timeout_secs.to_string(),
            });
        }
        Ok(())
    }
}

/// Defaults, then the TOML file, then environment overrides.
///
/// An explicit `path` must exist; without one, `backoffice.toml` in the
/// working directory is read when present.
pub fn load_settings(path: Option<&Path>) -> Result<ClientSettings, SettingsError> {
    let mut settings = match path {
        Some(path) => read_settings_file(path)?,
        None => {
            let default_path = Path::new(DEFAULT_SETTINGS_FILE);
            if default_path.exists() {
                read_settings_file(default_path)?
            } else {
                ClientSettings::default()
            }
        }
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    settings.validate()?;
    Ok(settings)
}

pub fn parse_settings(raw: &str, path: &Path) -> Result<ClientSettings, SettingsError> {
    let mut settings: ClientSettings =
        toml::from_str(raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    // Labels in the file extend the built-in ones instead of replacing them.
    let mut labels = default_field_labels();
    labels.append(&mut settings.field_labels);
    settings.field_labels = labels;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<ClientSettings, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_settings(&raw, path)
}

pub fn apply_env_overrides<F>(settings: &mut ClientSettings, lookup: F) -> Result<(), SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("BACKOFFICE_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs =
            v.trim().parse().map_err(|_| SettingsError::InvalidValue {
                key: "APP__REQUEST_TIMEOUT_SECS",
                value: v.clone(),
            })?;
    }

    if let Some(v) = lookup("APP__DEFAULT_PAGE_SIZE") {
        settings.default_page_size =
            v.trim().parse().map_err(|_| SettingsError::InvalidValue {
                key: "APP__DEFAULT_PAGE_SIZE",
                value: v.clone(),
            })?;
    }

    if let Some(v) = lookup("APP__FALLBACK_ERROR_MESSAGE") {
        settings.fallback_error_message = v;
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
