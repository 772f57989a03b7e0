//! Domain snapshot types consumed by the pipeline.
//!
//! A [`Snapshot`] is supplied fresh by the data source every time the
//! underlying permission state changes. Nothing in this crate mutates it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Read;
use thiserror::Error;

/// Declaring namespace of the platform's own permission groups.
pub const PLATFORM_NAMESPACE: &str = "android";

/// Legacy group label that is never shown, whatever the filter.
pub const LEGACY_EXCLUDED_LABEL: &str = "Storage";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapshotError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One observed access of a capability group by an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub package_name: String,
    pub group_name: String,
    pub group_label: String,
    /// Epoch milliseconds. Zero means the group was never accessed.
    pub access_time_ms: i64,
}

impl UsageRecord {
    pub fn was_accessed(&self) -> bool {
        self.access_time_ms != 0
    }
}

/// An application holding a capability group, with its usage history for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupGrant {
    pub app_key: String,
    /// Whether this group is user-visible for this app at all.
    #[serde(default = "default_true")]
    pub shown: bool,
    #[serde(default)]
    pub usages: Vec<UsageRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityGroup {
    pub name: String,
    pub label: String,
    pub declaring_namespace: String,
    #[serde(default)]
    pub icon: String,
    /// Low-level permissions belonging to this group.
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub grants: Vec<GroupGrant>,
}

impl CapabilityGroup {
    pub fn is_declared_by(&self, namespace: &str) -> bool {
        self.declaring_namespace == namespace
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub icon: String,
    /// Policy override: treat as user-facing even when not launchable.
    #[serde(default)]
    pub non_system_policy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub groups: Vec<CapabilityGroup>,
    #[serde(default)]
    pub apps: Vec<Application>,
    /// Packages the user can launch directly.
    #[serde(default)]
    pub launcher_packages: BTreeSet<String>,
}

impl Snapshot {
    pub fn from_json_str(raw: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_reader(reader: impl Read) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn app(&self, key: &str) -> Option<&Application> {
        self.apps.iter().find(|app| app.key == key)
    }

    pub fn is_launcher_package(&self, key: &str) -> bool {
        self.launcher_packages.contains(key)
    }

    /// Groups declared by `namespace`, in snapshot order, with their index.
    pub fn platform_groups<'a>(
        &'a self,
        namespace: &'a str,
    ) -> impl Iterator<Item = (usize, &'a CapabilityGroup)> + 'a {
        self.groups
            .iter()
            .enumerate()
            .filter(move |(_, group)| group.is_declared_by(namespace))
    }
}

/// Rules that decide which groups are eligible at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRules {
    pub platform_namespace: String,
    pub excluded_labels: Vec<String>,
}

impl PipelineRules {
    pub fn is_excluded_label(&self, label: &str) -> bool {
        self.excluded_labels.iter().any(|excluded| excluded == label)
    }
}

impl Default for PipelineRules {
    fn default() -> Self {
        Self {
            platform_namespace: PLATFORM_NAMESPACE.to_string(),
            excluded_labels: vec![LEGACY_EXCLUDED_LABEL.to_string()],
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_parses_with_defaults() {
        let raw = r#"{
            "groups": [{
                "name": "android.permission-group.CAMERA",
                "label": "Camera",
                "declaring_namespace": "android",
                "grants": [{
                    "app_key": "com.example.cam",
                    "usages": [{
                        "package_name": "com.example.cam",
                        "group_name": "android.permission-group.CAMERA",
                        "group_label": "Camera",
                        "access_time_ms": 1000
                    }]
                }]
            }],
            "apps": [{ "key": "com.example.cam", "label": "Cam" }],
            "launcher_packages": ["com.example.cam"]
        }"#;

        let snapshot = Snapshot::from_json_str(raw).expect("parse snapshot");
        let grant = &snapshot.groups[0].grants[0];
        assert!(grant.shown);
        assert!(snapshot.groups[0].permissions.is_empty());
        assert_eq!(snapshot.app("com.example.cam").map(|a| a.label.as_str()), Some("Cam"));
        assert!(!snapshot.apps[0].non_system_policy);
        assert!(snapshot.is_launcher_package("com.example.cam"));
        assert!(!snapshot.is_launcher_package("com.example.other"));
    }

    #[test]
    fn malformed_snapshot_is_a_parse_error() {
        let err = Snapshot::from_json_str("{\"groups\": 3}").unwrap_err();
        assert!(matches!(err, SnapshotError::Parse(_)));
    }

    #[test]
    fn platform_groups_keep_snapshot_indices() {
        let mut snapshot = Snapshot::default();
        for (name, ns) in [("a", "android"), ("b", "com.vendor"), ("c", "android")] {
            snapshot.groups.push(CapabilityGroup {
                name: name.to_string(),
                label: name.to_uppercase(),
                declaring_namespace: ns.to_string(),
                icon: String::new(),
                permissions: Vec::new(),
                grants: Vec::new(),
            });
        }

        let indices: Vec<usize> = snapshot
            .platform_groups(PLATFORM_NAMESPACE)
            .map(|(index, _)| index)
            .collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn default_rules_exclude_storage() {
        let rules = PipelineRules::default();
        assert!(rules.is_excluded_label("Storage"));
        assert!(!rules.is_excluded_label("Camera"));
    }
}
