pub mod aggregate;
pub mod controller;
pub mod filter;
pub mod model;
pub mod pipeline;
pub mod present;

pub use aggregate::{Aggregation, AppBucket, MatchedGroup, aggregate, is_system_app};
pub use controller::{SavedSelection, UsageController};
pub use filter::{
    Collator, CollatorError, DisplayLabels, FilterOptions, FilterSelection, FoldingCollator,
    GroupFilterOption, LocaleCollator, RecencyWindow, TimeFilterOption,
};
pub use model::{
    Application, CapabilityGroup, GroupGrant, PipelineRules, Snapshot, SnapshotError, UsageRecord,
};
pub use pipeline::{Clock, FixedClock, Pipeline, SystemClock, UsageView, compute_display_tree};
pub use present::{DisplayEntry, GroupedEntry, UsageEntry, build_display_tree};

#[cfg(test)]
mod testing;
