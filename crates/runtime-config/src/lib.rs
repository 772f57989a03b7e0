//! Shared permusage configuration types.
//!
//! `permusage.toml` carries the filter rules and user-facing labels;
//! `state.toml` carries the view state a host persists between runs.
//! Conversion into pipeline types happens in the consuming crate.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "permusage.toml";

/// Persisted view state file name.
pub const STATE_FILE_NAME: &str = "state.toml";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level configuration (persisted as `permusage.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UsageConfig {
    #[serde(default)]
    pub filters: FilterSettings,
    #[serde(default)]
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterSettings {
    /// Only groups declared by this namespace are listed.
    #[serde(default = "default_platform_namespace")]
    pub platform_namespace: String,
    /// Group labels that are never shown.
    #[serde(default = "default_excluded_labels")]
    pub excluded_labels: Vec<String>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            platform_namespace: default_platform_namespace(),
            excluded_labels: default_excluded_labels(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplaySettings {
    #[serde(default = "default_any_group_label")]
    pub any_group_label: String,
    #[serde(default = "default_any_time_label")]
    pub any_time_label: String,
    #[serde(default = "default_last_7_days_label")]
    pub last_7_days_label: String,
    #[serde(default = "default_last_24_hours_label")]
    pub last_24_hours_label: String,
    #[serde(default = "default_last_hour_label")]
    pub last_hour_label: String,
    #[serde(default = "default_last_15_minutes_label")]
    pub last_15_minutes_label: String,
    /// `{group}` and `{time}` are substituted per entry.
    #[serde(default = "default_summary_template")]
    pub summary_template: String,
    /// BCP-47 locale used to collate group labels; `und` is the root order.
    #[serde(default = "default_locale")]
    pub locale: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            any_group_label: default_any_group_label(),
            any_time_label: default_any_time_label(),
            last_7_days_label: default_last_7_days_label(),
            last_24_hours_label: default_last_24_hours_label(),
            last_hour_label: default_last_hour_label(),
            last_15_minutes_label: default_last_15_minutes_label(),
            summary_template: default_summary_template(),
            locale: default_locale(),
        }
    }
}

/// View state saved between runs (persisted as `state.toml`).
///
/// Indices are hints only; `group_filter_label` decides whether the saved
/// group index still means the same thing.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PersistedViewState {
    #[serde(default)]
    pub show_system: bool,
    #[serde(default)]
    pub group_filter_index: Option<usize>,
    #[serde(default)]
    pub group_filter_label: Option<String>,
    #[serde(default)]
    pub time_filter_index: Option<usize>,
}

// ── Serde default functions ─────────────────────────────────────────────

fn default_platform_namespace() -> String {
    "android".to_string()
}
fn default_excluded_labels() -> Vec<String> {
    vec!["Storage".to_string()]
}
fn default_any_group_label() -> String {
    "All permissions".to_string()
}
fn default_any_time_label() -> String {
    "Any time".to_string()
}
fn default_last_7_days_label() -> String {
    "Last 7 days".to_string()
}
fn default_last_24_hours_label() -> String {
    "Last 24 hours".to_string()
}
fn default_last_hour_label() -> String {
    "Last hour".to_string()
}
fn default_last_15_minutes_label() -> String {
    "Last 15 minutes".to_string()
}
fn default_summary_template() -> String {
    "accessed {group}, {time}".to_string()
}
fn default_locale() -> String {
    "und".to_string()
}

/// Apply compatibility fallbacks after loading raw TOML.
/// Returns true when any field was updated.
pub fn apply_compat_fallbacks(config: &mut UsageConfig) -> bool {
    let mut changed = false;

    if config.filters.platform_namespace.trim().is_empty() {
        config.filters.platform_namespace = default_platform_namespace();
        changed = true;
    }

    let display = &mut config.display;
    changed |= fill_blank(&mut display.any_group_label, default_any_group_label);
    changed |= fill_blank(&mut display.any_time_label, default_any_time_label);
    changed |= fill_blank(&mut display.last_7_days_label, default_last_7_days_label);
    changed |= fill_blank(&mut display.last_24_hours_label, default_last_24_hours_label);
    changed |= fill_blank(&mut display.last_hour_label, default_last_hour_label);
    changed |= fill_blank(&mut display.last_15_minutes_label, default_last_15_minutes_label);
    changed |= fill_blank(&mut display.summary_template, default_summary_template);
    changed |= fill_blank(&mut display.locale, default_locale);

    changed
}

fn fill_blank(field: &mut String, fallback: fn() -> String) -> bool {
    if field.trim().is_empty() {
        *field = fallback();
        true
    } else {
        false
    }
}

pub fn parse_config(raw: &str, origin: &str) -> Result<UsageConfig, ConfigError> {
    let mut config: UsageConfig = toml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: origin.to_string(),
        source,
    })?;
    apply_compat_fallbacks(&mut config);
    Ok(config)
}

/// Load `path`, or defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<UsageConfig, ConfigError> {
    match read_optional(path)? {
        Some(raw) => parse_config(&raw, &path.display().to_string()),
        None => Ok(UsageConfig::default()),
    }
}

/// Load persisted view state, or `None` when nothing was saved yet.
pub fn load_view_state(path: &Path) -> Result<Option<PersistedViewState>, ConfigError> {
    let Some(raw) = read_optional(path)? else {
        return Ok(None);
    };
    toml::from_str(&raw)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
}

pub fn save_view_state(path: &Path, state: &PersistedViewState) -> Result<(), ConfigError> {
    let body = toml::to_string(state)?;
    let io_err = |source: std::io::Error| ConfigError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, body).map_err(io_err)
}

fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}
