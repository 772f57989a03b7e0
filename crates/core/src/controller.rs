//! Presentation-side state that survives snapshot refreshes.
//!
//! The controller owns the filter selection and reacts to the two kinds of
//! triggers (new snapshot, changed selection) with a full recomputation.
//! Recomputation takes `&mut self`, so successive passes are serialized and
//! a caller never observes a half-built view.

use crate::filter::{
    FilterOptions, FilterSelection, GroupRestore, GroupSelection, resolve_target_group,
    restore_group_selection, restore_time_selection,
};
use crate::model::Snapshot;
use crate::pipeline::{Clock, Pipeline, UsageView};
use serde::{Deserialize, Serialize};

/// Selection hints saved by a previous process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSelection {
    #[serde(default)]
    pub show_system: bool,
    #[serde(default)]
    pub group_index: Option<usize>,
    /// Label at `group_index` when it was saved; validates the index.
    #[serde(default)]
    pub group_label: Option<String>,
    #[serde(default)]
    pub time_index: Option<usize>,
}

#[derive(Debug)]
pub struct UsageController<C: Clock> {
    pipeline: Pipeline,
    clock: C,
    snapshot: Option<Snapshot>,
    options: FilterOptions,
    group: Option<GroupSelection>,
    time_index: usize,
    show_system: bool,
    /// Deep-link target, consumed by the first population.
    pending_target: Option<String>,
    saved: Option<SavedSelection>,
    attached: bool,
    view: Option<UsageView>,
}

impl<C: Clock> UsageController<C> {
    pub fn new(
        pipeline: Pipeline,
        clock: C,
        target: Option<String>,
        saved: Option<SavedSelection>,
    ) -> Self {
        let time_index = restore_time_selection(saved.as_ref().and_then(|s| s.time_index));
        let show_system = saved.as_ref().is_some_and(|s| s.show_system);
        Self {
            options: FilterOptions {
                group_options: Vec::new(),
                time_options: crate::filter::build_time_options(&pipeline.labels),
            },
            pipeline,
            clock,
            snapshot: None,
            group: None,
            time_index,
            show_system,
            pending_target: target,
            saved,
            attached: true,
            view: None,
        }
    }

    /// The hosting surface went away; later triggers do nothing.
    pub fn detach(&mut self) {
        self.attached = false;
        self.view = None;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn view(&self) -> Option<&UsageView> {
        self.view.as_ref()
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    pub fn selected_group(&self) -> Option<&GroupSelection> {
        self.group.as_ref()
    }

    pub fn selected_time_index(&self) -> usize {
        self.time_index
    }

    pub fn show_system(&self) -> bool {
        self.show_system
    }

    pub fn selection(&self) -> FilterSelection {
        FilterSelection::from_positions(
            &self.options,
            self.group.as_ref().map_or(0, |g| g.index),
            self.time_index,
            self.show_system,
        )
    }

    /// State to persist across process restarts.
    pub fn saved_selection(&self) -> SavedSelection {
        SavedSelection {
            show_system: self.show_system,
            group_index: self.group.as_ref().map(|g| g.index),
            group_label: self.group.as_ref().map(|g| g.label.clone()),
            time_index: Some(self.time_index),
        }
    }

    /// New data arrived. Rebuilds group options, restores the selection,
    /// and recomputes.
    pub fn on_snapshot_changed(&mut self, snapshot: Snapshot) -> Option<&UsageView> {
        if !self.attached {
            return None;
        }
        if snapshot.groups.is_empty() {
            tracing::debug!("snapshot has no permission groups yet, keeping filter options");
        } else {
            self.rebuild_group_options(&snapshot);
        }
        self.snapshot = Some(snapshot);
        self.recompute()
    }

    fn rebuild_group_options(&mut self, snapshot: &Snapshot) {
        let group_options = self.pipeline.options(snapshot).group_options;

        let target = match (&self.group, self.pending_target.take()) {
            (None, Some(raw)) => resolve_target_group(snapshot, &self.pipeline.rules, &raw),
            _ => None,
        };
        let saved = if self.group.is_none() {
            self.saved.take()
        } else {
            None
        };

        let restored = restore_group_selection(
            &group_options,
            &GroupRestore {
                previous_label: self.group.as_ref().map(|g| g.label.as_str()),
                target_group: target.as_deref(),
                saved_index: saved.as_ref().and_then(|s| s.group_index),
                saved_label: saved.as_ref().and_then(|s| s.group_label.as_deref()),
            },
        );
        if let Some(previous) = &self.group {
            if previous.label != restored.label {
                tracing::debug!(
                    previous = %previous.label,
                    "selected permission filter no longer available, showing all"
                );
            }
        }

        self.options.group_options = group_options;
        self.group = Some(restored);
    }

    pub fn select_group_option(&mut self, index: usize) -> Option<&UsageView> {
        if !self.attached {
            return None;
        }
        let index = if index < self.options.group_options.len() {
            index
        } else {
            tracing::warn!(index, "group filter index out of range, showing all");
            0
        };
        self.group = self
            .options
            .group_options
            .get(index)
            .map(|option| GroupSelection {
                index,
                label: option.label.clone(),
            });
        self.recompute()
    }

    pub fn select_time_option(&mut self, index: usize) -> Option<&UsageView> {
        if !self.attached {
            return None;
        }
        self.time_index = restore_time_selection(Some(index));
        self.recompute()
    }

    pub fn set_show_system(&mut self, show_system: bool) -> Option<&UsageView> {
        if !self.attached {
            return None;
        }
        self.show_system = show_system;
        self.recompute()
    }

    /// Full recomputation from the current snapshot and selection.
    /// Returns `None` when detached or before the first snapshot.
    pub fn recompute(&mut self) -> Option<&UsageView> {
        if !self.attached {
            return None;
        }
        let snapshot = self.snapshot.as_ref()?;
        let selection = self.selection();
        let view = self.pipeline.compute_with_options(
            self.options.clone(),
            snapshot,
            &selection,
            self.clock.now(),
        );
        self.view = Some(view);
        self.view.as_ref()
    }
}
