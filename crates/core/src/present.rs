//! Order aggregated buckets and shape them into display entries.

use crate::aggregate::{AppBucket, Aggregation, MatchedGroup};
use crate::filter::DisplayLabels;
use crate::model::Snapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

/// One (application, group) row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageEntry {
    /// `app_key + "," + group_name`, stable across passes.
    pub key: String,
    pub app_key: String,
    pub title: String,
    /// Only set on top-level rows; children of a grouped entry omit it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_icon: Option<String>,
    pub group_name: String,
    pub group_label: String,
    pub group_icon: String,
    pub last_access_ms: i64,
    pub summary: String,
}

/// Expandable row for an application with several matching groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupedEntry {
    pub app_key: String,
    pub title: String,
    pub icon: String,
    pub group_icons: Vec<String>,
    pub children: Vec<UsageEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayEntry {
    Single(UsageEntry),
    Grouped(GroupedEntry),
}

impl DisplayEntry {
    pub fn app_key(&self) -> &str {
        match self {
            Self::Single(entry) => &entry.app_key,
            Self::Grouped(group) => &group.app_key,
        }
    }

    /// Leaf rows of this entry, in display order.
    pub fn rows(&self) -> &[UsageEntry] {
        match self {
            Self::Single(entry) => std::slice::from_ref(entry),
            Self::Grouped(group) => &group.children,
        }
    }
}

pub fn entry_key(app_key: &str, group_name: &str) -> String {
    format!("{app_key},{group_name}")
}

/// Compact relative time, e.g. `"45s ago"`, `"3h ago"`.
pub fn format_time_diff(diff_ms: i64) -> String {
    let delta = (diff_ms / 1000).max(0);
    if delta < 60 {
        format!("{delta}s ago")
    } else if delta < 3600 {
        format!("{}m ago", delta / 60)
    } else if delta < 86_400 {
        format!("{}h ago", delta / 3600)
    } else {
        format!("{}d ago", delta / 86_400)
    }
}

/// Most recent first; equal timestamps compare equal so stable sorts keep
/// input order.
fn compare_access_time(x: i64, y: i64) -> Ordering {
    y.cmp(&x)
}

fn compare_apps(x: &AppBucket, y: &AppBucket) -> Ordering {
    y.group_count()
        .cmp(&x.group_count())
        .then_with(|| compare_access_time(x.latest_access_ms(), y.latest_access_ms()))
}

struct EntryContext<'a> {
    app_key: &'a str,
    title: &'a str,
    now_ms: i64,
    labels: &'a DisplayLabels,
}

impl EntryContext<'_> {
    fn entry(&self, group: &MatchedGroup, app_icon: Option<&str>) -> UsageEntry {
        let time_diff = format_time_diff(self.now_ms.saturating_sub(group.latest_access_ms()));
        UsageEntry {
            key: entry_key(self.app_key, &group.name),
            app_key: self.app_key.to_string(),
            title: self.title.to_string(),
            app_icon: app_icon.map(str::to_string),
            group_name: group.name.clone(),
            group_label: group.latest.group_label.clone(),
            group_icon: group.icon.clone(),
            last_access_ms: group.latest_access_ms(),
            summary: self.labels.summary(&group.latest.group_label, &time_diff),
        }
    }
}

/// Sort and shape `aggregation` into the final entry list.
///
/// Apps with more matching groups come first, then apps with the most
/// recent access. An (app, group name) pair reached through more than one
/// group path is emitted once.
pub fn build_display_tree(
    aggregation: &Aggregation,
    snapshot: &Snapshot,
    now: DateTime<Utc>,
    labels: &DisplayLabels,
) -> Vec<DisplayEntry> {
    let now_ms = now.timestamp_millis();
    let mut apps: Vec<&AppBucket> = aggregation.buckets.values().collect();
    apps.sort_by(|x, y| compare_apps(x, y));

    let mut emitted = HashSet::new();
    let mut tree = Vec::with_capacity(apps.len());
    for bucket in apps {
        let mut groups: Vec<&MatchedGroup> = bucket.groups.values().collect();
        groups.sort_by(|x, y| compare_access_time(x.latest_access_ms(), y.latest_access_ms()));
        groups.retain(|group| emitted.insert(entry_key(&bucket.app_key, &group.name)));

        let (title, icon) = match snapshot.app(&bucket.app_key) {
            Some(app) => (app.label.as_str(), app.icon.as_str()),
            None => (bucket.app_key.as_str(), ""),
        };
        let ctx = EntryContext {
            app_key: &bucket.app_key,
            title,
            now_ms,
            labels,
        };

        match groups.as_slice() {
            [] => {}
            [only] => tree.push(DisplayEntry::Single(ctx.entry(only, Some(icon)))),
            many => tree.push(DisplayEntry::Grouped(GroupedEntry {
                app_key: bucket.app_key.clone(),
                title: title.to_string(),
                icon: icon.to_string(),
                group_icons: many.iter().map(|group| group.icon.clone()).collect(),
                children: many.iter().map(|group| ctx.entry(group, None)).collect(),
            })),
        }
    }

    tracing::debug!(entries = tree.len(), "built permission usage tree");
    tree
}
