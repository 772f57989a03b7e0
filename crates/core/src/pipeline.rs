//! Single-pass entry point: snapshot + selection + now -> options, tree, flag.

use crate::aggregate::aggregate;
use crate::filter::{Collator, DisplayLabels, FilterOptions, FilterSelection, FoldingCollator};
use crate::model::{PipelineRules, Snapshot};
use crate::present::{DisplayEntry, build_display_tree};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Wall-clock source, injectable for deterministic passes.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Result of one recomputation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageView {
    pub options: FilterOptions,
    pub tree: Vec<DisplayEntry>,
    pub has_system_apps: bool,
}

impl UsageView {
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

/// Rules, labels and collation shared by every pass.
pub struct Pipeline {
    pub rules: PipelineRules,
    pub labels: DisplayLabels,
    collator: Box<dyn Collator + Send + Sync>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineRules::default(), DisplayLabels::default())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("rules", &self.rules)
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(rules: PipelineRules, labels: DisplayLabels) -> Self {
        Self {
            rules,
            labels,
            collator: Box::new(FoldingCollator),
        }
    }

    pub fn with_collator(mut self, collator: impl Collator + Send + Sync + 'static) -> Self {
        self.collator = Box::new(collator);
        self
    }

    pub fn options(&self, snapshot: &Snapshot) -> FilterOptions {
        FilterOptions::build(snapshot, &self.rules, &self.labels, self.collator.as_ref())
    }

    pub fn compute(
        &self,
        snapshot: &Snapshot,
        selection: &FilterSelection,
        now: DateTime<Utc>,
    ) -> UsageView {
        self.compute_with_options(self.options(snapshot), snapshot, selection, now)
    }

    /// Recompute the tree against options the caller already holds.
    pub fn compute_with_options(
        &self,
        options: FilterOptions,
        snapshot: &Snapshot,
        selection: &FilterSelection,
        now: DateTime<Utc>,
    ) -> UsageView {
        let aggregation = aggregate(snapshot, selection, &self.rules, now);
        let tree = build_display_tree(&aggregation, snapshot, now, &self.labels);
        UsageView {
            options,
            tree,
            has_system_apps: aggregation.has_system_apps,
        }
    }
}

/// Run one pass with default rules, labels and collation.
pub fn compute_display_tree(
    snapshot: &Snapshot,
    selection: &FilterSelection,
    now: DateTime<Utc>,
) -> UsageView {
    Pipeline::default().compute(snapshot, selection, now)
}
