//! Filter option catalog and selection restoration.
//!
//! Group options depend on the snapshot and are rebuilt every time it
//! changes; time options are fixed. Selections are carried across rebuilds
//! by label, never by raw index, because the group list can grow or shrink
//! between snapshots.

use crate::model::{PipelineRules, Snapshot};
use icu_collator::options::CollatorOptions;
use icu_collator::{Collator as IcuCollator, CollatorBorrowed, CollatorPreferences};
use icu_locale_core::Locale;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Recency window, most permissive first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecencyWindow {
    #[default]
    AnyTime,
    Last7Days,
    Last24Hours,
    LastHour,
    Last15Minutes,
    /// Arbitrary threshold in seconds.
    Custom(u64),
}

impl RecencyWindow {
    /// The selectable windows, in display order.
    pub const ALL: [RecencyWindow; 5] = [
        RecencyWindow::AnyTime,
        RecencyWindow::Last7Days,
        RecencyWindow::Last24Hours,
        RecencyWindow::LastHour,
        RecencyWindow::Last15Minutes,
    ];

    /// Maximum age in seconds. `u64::MAX` means unbounded.
    pub fn threshold_secs(self) -> u64 {
        match self {
            Self::AnyTime => u64::MAX,
            Self::Last7Days => 60 * 60 * 24 * 7,
            Self::Last24Hours => 60 * 60 * 24,
            Self::LastHour => 60 * 60,
            Self::Last15Minutes => 60 * 15,
            Self::Custom(secs) => secs,
        }
    }

    pub fn is_unbounded(self) -> bool {
        self.threshold_secs() == u64::MAX
    }

    pub fn shorthand(self) -> String {
        match self {
            Self::AnyTime => "any".to_string(),
            Self::Last7Days => "7d".to_string(),
            Self::Last24Hours => "24h".to_string(),
            Self::LastHour => "1h".to_string(),
            Self::Last15Minutes => "15m".to_string(),
            Self::Custom(secs) => format!("{secs}s"),
        }
    }
}

impl fmt::Display for RecencyWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.shorthand())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRecencyWindowError(String);

impl fmt::Display for ParseRecencyWindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown time window '{}', expected one of any, 7d, 24h, 1h, 15m or <N>s",
            self.0
        )
    }
}

impl std::error::Error for ParseRecencyWindowError {}

impl FromStr for RecencyWindow {
    type Err = ParseRecencyWindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_ascii_lowercase();
        match raw.as_str() {
            "any" | "all" => Ok(Self::AnyTime),
            "7d" => Ok(Self::Last7Days),
            "24h" | "1d" => Ok(Self::Last24Hours),
            "1h" => Ok(Self::LastHour),
            "15m" => Ok(Self::Last15Minutes),
            _ => raw
                .strip_suffix('s')
                .and_then(|secs| secs.parse::<u64>().ok())
                .map(Self::Custom)
                .ok_or_else(|| ParseRecencyWindowError(s.to_string())),
        }
    }
}

/// User-facing strings for filter options and entry summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLabels {
    pub any_group: String,
    pub any_time: String,
    pub last_7_days: String,
    pub last_24_hours: String,
    pub last_hour: String,
    pub last_15_minutes: String,
    /// `{group}` and `{time}` are substituted.
    pub summary_template: String,
}

impl DisplayLabels {
    pub fn window_label(&self, window: RecencyWindow) -> String {
        match window {
            RecencyWindow::AnyTime => self.any_time.clone(),
            RecencyWindow::Last7Days => self.last_7_days.clone(),
            RecencyWindow::Last24Hours => self.last_24_hours.clone(),
            RecencyWindow::LastHour => self.last_hour.clone(),
            RecencyWindow::Last15Minutes => self.last_15_minutes.clone(),
            RecencyWindow::Custom(secs) => format!("Last {secs} seconds"),
        }
    }

    pub fn summary(&self, group_label: &str, time_diff: &str) -> String {
        self.summary_template
            .replace("{group}", group_label)
            .replace("{time}", time_diff)
    }
}

impl Default for DisplayLabels {
    fn default() -> Self {
        Self {
            any_group: "All permissions".to_string(),
            any_time: "Any time".to_string(),
            last_7_days: "Last 7 days".to_string(),
            last_24_hours: "Last 24 hours".to_string(),
            last_hour: "Last hour".to_string(),
            last_15_minutes: "Last 15 minutes".to_string(),
            summary_template: "accessed {group}, {time}".to_string(),
        }
    }
}

/// Active filters for one recomputation pass. Owned by the caller and only
/// read by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    /// Label of the selected group; `None` matches every group.
    #[serde(default)]
    pub group_label: Option<String>,
    #[serde(default)]
    pub window: RecencyWindow,
    #[serde(default)]
    pub show_system: bool,
}

impl FilterSelection {
    /// Selection for the option positions currently chosen in `options`.
    /// Out-of-range positions select "any".
    pub fn from_positions(
        options: &FilterOptions,
        group_index: usize,
        time_index: usize,
        show_system: bool,
    ) -> Self {
        Self {
            group_label: options
                .group_options
                .get(group_index)
                .and_then(|option| option.group_label.clone()),
            window: options
                .time_options
                .get(time_index)
                .map(|option| option.window)
                .unwrap_or_default(),
            show_system,
        }
    }

    pub fn matches_group(&self, label: &str) -> bool {
        self.group_label.as_deref().is_none_or(|wanted| wanted == label)
    }
}

/// Label ordering used for the group option list.
pub trait Collator {
    fn compare(&self, a: &str, b: &str) -> Ordering;
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CollatorError {
    #[error("invalid collation locale '{locale}': {reason}")]
    InvalidLocale { locale: String, reason: String },
    #[error("no collation data for '{locale}': {reason}")]
    Data { locale: String, reason: String },
}

/// Unicode collation for a locale, backed by ICU4X compiled data.
pub struct LocaleCollator {
    locale: String,
    collator: CollatorBorrowed<'static>,
}

impl LocaleCollator {
    /// `locale` is a BCP-47 tag such as `fr`, `de-CH` or `und` for the root
    /// collation order.
    pub fn try_new(locale: &str) -> Result<Self, CollatorError> {
        let parsed = locale
            .trim()
            .parse::<Locale>()
            .map_err(|err| CollatorError::InvalidLocale {
                locale: locale.to_string(),
                reason: err.to_string(),
            })?;
        let tag = parsed.to_string();
        let collator = IcuCollator::try_new(
            CollatorPreferences::from(&parsed),
            CollatorOptions::default(),
        )
        .map_err(|err| CollatorError::Data {
            locale: tag.clone(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            locale: tag,
            collator,
        })
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }
}

impl fmt::Debug for LocaleCollator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocaleCollator")
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}

impl Collator for LocaleCollator {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        self.collator.compare(a, b)
    }
}

/// Locale-independent fallback: case-folded text first, raw text second,
/// so `"apple"` sorts before `"Banana"` and `"Banana"` before `"banana"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FoldingCollator;

impl Collator for FoldingCollator {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        let folded_a = a.chars().flat_map(char::to_lowercase);
        let folded_b = b.chars().flat_map(char::to_lowercase);
        folded_a.cmp(folded_b).then_with(|| a.cmp(b))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupFilterOption {
    pub label: String,
    /// `None` for the synthetic "any group" option.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_label: Option<String>,
}

impl GroupFilterOption {
    pub fn is_any(&self) -> bool {
        self.group_name.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeFilterOption {
    pub label: String,
    pub window: RecencyWindow,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub group_options: Vec<GroupFilterOption>,
    pub time_options: Vec<TimeFilterOption>,
}

impl FilterOptions {
    pub fn build(
        snapshot: &Snapshot,
        rules: &PipelineRules,
        labels: &DisplayLabels,
        collator: &dyn Collator,
    ) -> Self {
        Self {
            group_options: build_group_options(snapshot, rules, labels, collator),
            time_options: build_time_options(labels),
        }
    }
}

/// "Any group" first, then each distinct platform group label in collation order.
pub fn build_group_options(
    snapshot: &Snapshot,
    rules: &PipelineRules,
    labels: &DisplayLabels,
    collator: &dyn Collator,
) -> Vec<GroupFilterOption> {
    let mut groups: Vec<_> = snapshot
        .platform_groups(&rules.platform_namespace)
        .map(|(_, group)| group)
        .collect();
    groups.sort_by(|x, y| collator.compare(&x.label, &y.label));

    let mut options = Vec::with_capacity(groups.len() + 1);
    options.push(GroupFilterOption {
        label: labels.any_group.clone(),
        group_name: None,
        group_label: None,
    });
    for group in groups {
        if options.iter().skip(1).any(|option| option.label == group.label) {
            continue;
        }
        options.push(GroupFilterOption {
            label: group.label.clone(),
            group_name: Some(group.name.clone()),
            group_label: Some(group.label.clone()),
        });
    }
    options
}

pub fn build_time_options(labels: &DisplayLabels) -> Vec<TimeFilterOption> {
    RecencyWindow::ALL
        .iter()
        .map(|&window| TimeFilterOption {
            label: labels.window_label(window),
            window,
        })
        .collect()
}

/// Resolve a deep-link target (a group name or one of its member
/// permissions) to a platform group name.
pub fn resolve_target_group(
    snapshot: &Snapshot,
    rules: &PipelineRules,
    target: &str,
) -> Option<String> {
    let resolved = snapshot
        .platform_groups(&rules.platform_namespace)
        .map(|(_, group)| group)
        .find(|group| group.name == target || group.permissions.iter().any(|p| p == target))
        .map(|group| group.name.clone());
    if resolved.is_none() {
        tracing::warn!(target_name = target, "invalid platform permission target, ignoring");
    }
    resolved
}

/// Current group filter selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSelection {
    pub index: usize,
    pub label: String,
}

/// Inputs to [`restore_group_selection`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupRestore<'a> {
    /// Label selected before the rebuild, if anything was selected yet.
    pub previous_label: Option<&'a str>,
    /// Resolved deep-link group name.
    pub target_group: Option<&'a str>,
    /// Persisted index hint from a previous process.
    pub saved_index: Option<usize>,
    /// Persisted label that validates `saved_index`.
    pub saved_label: Option<&'a str>,
}

/// Pick the selected group option after `options` was rebuilt.
///
/// The deep-link target only applies while nothing is selected. An existing
/// selection follows its label to its new position, or falls back to the
/// "any group" option when the label is gone.
pub fn restore_group_selection(
    options: &[GroupFilterOption],
    restore: &GroupRestore<'_>,
) -> GroupSelection {
    let position_of = |label: &str| options.iter().position(|option| option.label == label);

    let index = match restore.previous_label {
        Some(label) => position_of(label).unwrap_or(0),
        None => {
            let target = restore.target_group.and_then(|name| {
                options
                    .iter()
                    .position(|option| option.group_name.as_deref() == Some(name))
            });
            match (target, restore.saved_label, restore.saved_index) {
                (Some(index), _, _) => index,
                (None, Some(label), _) => position_of(label).unwrap_or(0),
                (None, None, Some(index)) if index < options.len() => index,
                _ => 0,
            }
        }
    };

    GroupSelection {
        index,
        label: options
            .get(index)
            .map(|option| option.label.clone())
            .unwrap_or_default(),
    }
}

/// Clamp a persisted time option index to the fixed option list.
pub fn restore_time_selection(saved_index: Option<usize>) -> usize {
    saved_index
        .filter(|index| *index < RecencyWindow::ALL.len())
        .unwrap_or(0)
}
