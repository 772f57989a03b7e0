//! Scan (group, app, record) triples, apply the active filters, and bucket
//! the surviving records per application.

use crate::filter::FilterSelection;
use crate::model::{Application, PipelineRules, Snapshot, UsageRecord};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::collections::HashSet;

/// A group matched for one application, with its most recent matching record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedGroup {
    /// Position of the group in the snapshot; identifies the traversal path.
    pub group_index: usize,
    pub name: String,
    pub label: String,
    pub icon: String,
    pub latest: UsageRecord,
}

impl MatchedGroup {
    pub fn latest_access_ms(&self) -> i64 {
        self.latest.access_time_ms
    }
}

/// Matching records of one application, in traversal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppBucket {
    pub app_key: String,
    pub usages: Vec<UsageRecord>,
    pub groups: IndexMap<usize, MatchedGroup>,
}

impl AppBucket {
    fn new(app_key: &str) -> Self {
        Self {
            app_key: app_key.to_string(),
            usages: Vec::new(),
            groups: IndexMap::new(),
        }
    }

    /// Distinct capability groups matched, however many paths reached them.
    pub fn group_count(&self) -> usize {
        self.groups
            .values()
            .map(|group| group.name.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Most recent access across every matching record of this app.
    pub fn latest_access_ms(&self) -> i64 {
        self.usages
            .iter()
            .map(|usage| usage.access_time_ms)
            .max()
            .unwrap_or(0)
    }

    fn add(&mut self, group_index: usize, name: &str, icon: &str, record: &UsageRecord) {
        self.usages.push(record.clone());
        self.groups
            .entry(group_index)
            .and_modify(|matched| {
                if record.access_time_ms > matched.latest.access_time_ms {
                    matched.latest = record.clone();
                }
            })
            .or_insert_with(|| MatchedGroup {
                group_index,
                name: name.to_string(),
                label: record.group_label.clone(),
                icon: icon.to_string(),
                latest: record.clone(),
            });
    }
}

/// Why a record did not make it into a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    NeverAccessed,
    GroupFiltered,
    ExcludedLabel,
    OutsideWindow,
    SystemHidden,
    Malformed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipCounts {
    pub never_accessed: usize,
    pub group_filtered: usize,
    pub excluded_label: usize,
    pub outside_window: usize,
    pub system_hidden: usize,
    pub malformed: usize,
}

impl SkipCounts {
    fn record(&mut self, reason: SkipReason) {
        let slot = match reason {
            SkipReason::NeverAccessed => &mut self.never_accessed,
            SkipReason::GroupFiltered => &mut self.group_filtered,
            SkipReason::ExcludedLabel => &mut self.excluded_label,
            SkipReason::OutsideWindow => &mut self.outside_window,
            SkipReason::SystemHidden => &mut self.system_hidden,
            SkipReason::Malformed => &mut self.malformed,
        };
        *slot += 1;
    }

    pub fn total(&self) -> usize {
        self.never_accessed
            + self.group_filtered
            + self.excluded_label
            + self.outside_window
            + self.system_hidden
            + self.malformed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    pub buckets: IndexMap<String, AppBucket>,
    /// Set once any system app matched the group and time filters,
    /// whether or not system apps are shown.
    pub has_system_apps: bool,
    pub skipped: SkipCounts,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn matched_record_count(&self) -> usize {
        self.buckets.values().map(|bucket| bucket.usages.len()).sum()
    }
}

/// An app is user-facing if the user can launch it or policy says so.
pub fn is_system_app(snapshot: &Snapshot, app: &Application) -> bool {
    !(snapshot.is_launcher_package(&app.key) || app.non_system_policy)
}

/// Whether a record accessed at `access_time_ms` is inside `threshold_secs`
/// of `now_ms`. Age is measured in whole seconds and the boundary is
/// inclusive; records from the future always pass.
pub fn within_window(now_ms: i64, access_time_ms: i64, threshold_secs: u64) -> bool {
    let age_secs = now_ms.saturating_sub(access_time_ms) / 1000;
    match u64::try_from(age_secs) {
        Ok(age) => age <= threshold_secs,
        Err(_) => true,
    }
}

/// Check a single record against filters that do not depend on the owning app.
fn check_record(
    record: &UsageRecord,
    group_label: &str,
    selection: &FilterSelection,
    rules: &PipelineRules,
    now_ms: i64,
) -> Result<(), SkipReason> {
    if !record.was_accessed() {
        return Err(SkipReason::NeverAccessed);
    }
    if record.access_time_ms < 0 {
        return Err(SkipReason::Malformed);
    }
    if !selection.matches_group(group_label) {
        return Err(SkipReason::GroupFiltered);
    }
    if rules.is_excluded_label(group_label) {
        return Err(SkipReason::ExcludedLabel);
    }
    if !within_window(now_ms, record.access_time_ms, selection.window.threshold_secs()) {
        return Err(SkipReason::OutsideWindow);
    }
    Ok(())
}

/// Run one aggregation pass over `snapshot`.
pub fn aggregate(
    snapshot: &Snapshot,
    selection: &FilterSelection,
    rules: &PipelineRules,
    now: DateTime<Utc>,
) -> Aggregation {
    let now_ms = now.timestamp_millis();
    let mut out = Aggregation::default();

    for (group_index, group) in snapshot.platform_groups(&rules.platform_namespace) {
        for grant in group.grants.iter().filter(|grant| grant.shown) {
            let Some(app) = snapshot.app(&grant.app_key) else {
                tracing::warn!(
                    app_key = %grant.app_key,
                    group = %group.name,
                    "grant references unknown application, skipping"
                );
                out.skipped.malformed += grant.usages.len();
                continue;
            };
            let is_system = is_system_app(snapshot, app);

            for record in &grant.usages {
                if let Err(reason) = check_record(record, &group.label, selection, rules, now_ms) {
                    if reason == SkipReason::Malformed {
                        tracing::warn!(
                            app_key = %app.key,
                            group = %group.name,
                            access_time_ms = record.access_time_ms,
                            "negative access time, skipping record"
                        );
                    }
                    out.skipped.record(reason);
                    continue;
                }

                if is_system && !out.has_system_apps {
                    out.has_system_apps = true;
                }
                if is_system && !selection.show_system {
                    out.skipped.record(SkipReason::SystemHidden);
                    continue;
                }

                out.buckets
                    .entry(app.key.clone())
                    .or_insert_with(|| AppBucket::new(&app.key))
                    .add(group_index, &group.name, &group.icon, record);
            }
        }
    }

    tracing::debug!(
        apps = out.buckets.len(),
        records = out.matched_record_count(),
        skipped = out.skipped.total(),
        has_system_apps = out.has_system_apps,
        "aggregated permission usage"
    );
    out
}
