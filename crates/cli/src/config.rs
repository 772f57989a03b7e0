use anyhow::{Context, Result};
use permusage_core::{DisplayLabels, LocaleCollator, Pipeline, PipelineRules, SavedSelection};
use permusage_runtime_config::{
    CONFIG_FILE_NAME, PersistedViewState, STATE_FILE_NAME, UsageConfig, load_config,
};
use std::path::{Path, PathBuf};

/// Environment override for the config file location.
pub const CONFIG_ENV: &str = "PERMUSAGE_CONFIG";

/// Get the config directory path (~/.config/permusage/)
pub fn config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(".config").join("permusage"))
}

/// Resolve the config path: explicit flag, then `$PERMUSAGE_CONFIG`, then
/// the default location.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    match std::env::var(CONFIG_ENV) {
        Ok(path) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(config_dir()?.join(CONFIG_FILE_NAME)),
    }
}

/// Default persisted view state location (~/.config/permusage/state.toml).
pub fn default_state_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(STATE_FILE_NAME))
}

pub fn load(explicit: Option<&Path>) -> Result<UsageConfig> {
    let path = config_path(explicit)?;
    let config = load_config(&path)
        .with_context(|| format!("Failed to load config at {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

pub fn pipeline_from_config(config: &UsageConfig) -> Result<Pipeline> {
    let rules = PipelineRules {
        platform_namespace: config.filters.platform_namespace.clone(),
        excluded_labels: config.filters.excluded_labels.clone(),
    };
    let display = &config.display;
    let labels = DisplayLabels {
        any_group: display.any_group_label.clone(),
        any_time: display.any_time_label.clone(),
        last_7_days: display.last_7_days_label.clone(),
        last_24_hours: display.last_24_hours_label.clone(),
        last_hour: display.last_hour_label.clone(),
        last_15_minutes: display.last_15_minutes_label.clone(),
        summary_template: display.summary_template.clone(),
    };
    let collator = LocaleCollator::try_new(&display.locale)
        .with_context(|| format!("Invalid [display] locale '{}'", display.locale))?;
    Ok(Pipeline::new(rules, labels).with_collator(collator))
}

pub fn saved_selection(state: &PersistedViewState) -> SavedSelection {
    SavedSelection {
        show_system: state.show_system,
        group_index: state.group_filter_index,
        group_label: state.group_filter_label.clone(),
        time_index: state.time_filter_index,
    }
}

pub fn persisted_state(saved: &SavedSelection) -> PersistedViewState {
    PersistedViewState {
        show_system: saved.show_system,
        group_filter_index: saved.group_index,
        group_filter_label: saved.group_label.clone(),
        time_filter_index: saved.time_index,
    }
}

/// Print the effective configuration as TOML.
pub fn show_config(explicit: Option<&Path>) -> Result<()> {
    let path = config_path(explicit)?;
    let config = load(explicit)?;
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
