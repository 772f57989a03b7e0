use crate::model::{Application, CapabilityGroup, GroupGrant, Snapshot, UsageRecord};

/// Platform group name for a label, e.g. `Camera` -> `android.permission-group.CAMERA`.
pub fn group_name(label: &str) -> String {
    format!("android.permission-group.{}", label.to_uppercase())
}

/// Platform group with the given grants.
pub fn group(label: &str, grants: Vec<GroupGrant>) -> CapabilityGroup {
    CapabilityGroup {
        name: group_name(label),
        label: label.to_string(),
        declaring_namespace: crate::model::PLATFORM_NAMESPACE.to_string(),
        icon: format!("ic_{}", label.to_lowercase()),
        permissions: Vec::new(),
        grants,
    }
}

pub fn record(app_key: &str, group_label: &str, access_time_ms: i64) -> UsageRecord {
    UsageRecord {
        package_name: app_key.to_string(),
        group_name: group_name(group_label),
        group_label: group_label.to_string(),
        access_time_ms,
    }
}

pub fn grant(app_key: &str, group_label: &str, times: &[i64]) -> GroupGrant {
    GroupGrant {
        app_key: app_key.to_string(),
        shown: true,
        usages: times
            .iter()
            .map(|&time| record(app_key, group_label, time))
            .collect(),
    }
}

pub fn app(key: &str) -> Application {
    Application {
        key: key.to_string(),
        label: format!("{key} label"),
        icon: format!("icon:{key}"),
        non_system_policy: false,
    }
}

/// Fluent snapshot construction for tests.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    snapshot: Snapshot,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user-launchable app.
    pub fn launchable(self, key: &str) -> Self {
        self.with_app(key, true)
    }

    /// Register a system app (not launchable, no policy override).
    pub fn system(self, key: &str) -> Self {
        self.with_app(key, false)
    }

    fn with_app(mut self, key: &str, launchable: bool) -> Self {
        if self.snapshot.app(key).is_none() {
            self.snapshot.apps.push(app(key));
        }
        if launchable {
            self.snapshot.launcher_packages.insert(key.to_string());
        } else {
            self.snapshot.launcher_packages.remove(key);
        }
        self
    }

    /// Add a grant of `group_label` to `app_key` with the given access times.
    /// Unknown apps are registered as launchable.
    pub fn usage(mut self, app_key: &str, group_label: &str, times: &[i64]) -> Self {
        if self.snapshot.app(app_key).is_none() {
            self = self.launchable(app_key);
        }
        let grant = grant(app_key, group_label, times);
        match self
            .snapshot
            .groups
            .iter_mut()
            .find(|g| g.label == group_label)
        {
            Some(existing) => existing.grants.push(grant),
            None => self.snapshot.groups.push(group(group_label, vec![grant])),
        }
        self
    }

    /// Append a second copy of an existing group, as a duplicate traversal path.
    pub fn duplicate_group(mut self, group_label: &str) -> Self {
        if let Some(copy) = self
            .snapshot
            .groups
            .iter()
            .find(|g| g.label == group_label)
            .cloned()
        {
            self.snapshot.groups.push(copy);
        }
        self
    }

    pub fn group(mut self, group: CapabilityGroup) -> Self {
        self.snapshot.groups.push(group);
        self
    }

    pub fn build(self) -> Snapshot {
        self.snapshot
    }
}
