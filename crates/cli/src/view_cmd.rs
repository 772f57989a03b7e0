use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use permusage_core::{FixedClock, RecencyWindow, Snapshot, UsageController};
use permusage_runtime_config::{load_view_state, save_view_state};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::config;
use crate::output::{self, OutputFormat, ViewHeader};

/// Recency window accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TimeArg {
    Any,
    #[value(name = "7d")]
    Days7,
    #[value(name = "24h")]
    Hours24,
    #[value(name = "1h")]
    Hour1,
    #[value(name = "15m")]
    Minutes15,
}

impl TimeArg {
    fn window(self) -> RecencyWindow {
        match self {
            Self::Any => RecencyWindow::AnyTime,
            Self::Days7 => RecencyWindow::Last7Days,
            Self::Hours24 => RecencyWindow::Last24Hours,
            Self::Hour1 => RecencyWindow::LastHour,
            Self::Minutes15 => RecencyWindow::Last15Minutes,
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct ViewArgs {
    /// Snapshot JSON file (groups, apps, launcher packages)
    pub snapshot: PathBuf,

    /// Only show this permission group (by label)
    #[arg(long)]
    pub group: Option<String>,

    /// Only show accesses within this window
    #[arg(long, value_enum)]
    pub time: Option<TimeArg>,

    /// Include system apps
    #[arg(long, conflicts_with = "hide_system")]
    pub show_system: bool,

    /// Exclude system apps, overriding saved state
    #[arg(long)]
    pub hide_system: bool,

    /// Preselect a permission group by group or permission name
    #[arg(long)]
    pub target: Option<String>,

    /// Reference time (RFC 3339); defaults to now
    #[arg(long)]
    pub now: Option<DateTime<Utc>>,

    /// Load and save filter state in this file
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Load and save filter state in ~/.config/permusage/state.toml
    #[arg(long, conflicts_with = "state")]
    pub remember: bool,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let file =
        File::open(path).with_context(|| format!("Failed to open snapshot {}", path.display()))?;
    Snapshot::from_json_reader(BufReader::new(file))
        .with_context(|| format!("Failed to read snapshot {}", path.display()))
}

/// Run the `view` command.
pub fn run_view(args: &ViewArgs, config_override: Option<&Path>) -> Result<()> {
    let config = config::load(config_override)?;
    let snapshot = load_snapshot(&args.snapshot)?;
    let state_path = match (&args.state, args.remember) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(config::default_state_path()?),
        (None, false) => None,
    };
    let saved = match &state_path {
        Some(path) => load_view_state(path)?.map(|state| config::saved_selection(&state)),
        None => None,
    };

    let now = args.now.unwrap_or_else(Utc::now);
    let mut controller = UsageController::new(
        config::pipeline_from_config(&config)?,
        FixedClock(now),
        args.target.clone(),
        saved,
    );
    controller.on_snapshot_changed(snapshot);

    if let Some(label) = &args.group {
        let options = &controller.options().group_options;
        let Some(index) = options.iter().position(|option| &option.label == label) else {
            let available: Vec<_> = options.iter().map(|option| option.label.as_str()).collect();
            bail!(
                "unknown permission filter '{label}', available: {}",
                available.join(", ")
            );
        };
        controller.select_group_option(index);
    }
    if let Some(time) = args.time {
        let window = time.window();
        let index = RecencyWindow::ALL
            .iter()
            .position(|candidate| *candidate == window)
            .unwrap_or(0);
        controller.select_time_option(index);
    }
    if args.show_system {
        controller.set_show_system(true);
    } else if args.hide_system {
        controller.set_show_system(false);
    }

    let view = controller
        .view()
        .context("Permission usage view was not computed")?;
    let group_label = controller
        .selected_group()
        .map(|g| g.label.as_str())
        .unwrap_or(config.display.any_group_label.as_str());
    let time_label = view
        .options
        .time_options
        .get(controller.selected_time_index())
        .map(|option| option.label.as_str())
        .unwrap_or(config.display.any_time_label.as_str());
    let header = ViewHeader {
        group: group_label,
        time: time_label,
        show_system: controller.show_system(),
    };
    output::render_view(view, &header, args.format, &mut std::io::stdout().lock())?;

    if let Some(path) = &state_path {
        save_view_state(path, &config::persisted_state(&controller.saved_selection()))?;
    }
    Ok(())
}

/// Run the `filters` command.
pub fn run_filters(
    snapshot: &Path,
    format: OutputFormat,
    config_override: Option<&Path>,
) -> Result<()> {
    let config = config::load(config_override)?;
    let snapshot = load_snapshot(snapshot)?;
    let options = config::pipeline_from_config(&config)?.options(&snapshot);
    output::render_filters(&options, format, &mut std::io::stdout().lock())
}
