mod config;
mod output;
mod view_cmd;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use output::OutputFormat;
use view_cmd::ViewArgs;

#[derive(Parser)]
#[command(
    name = "permusage",
    version,
    about = "Summarize which apps used which permission groups, and when"
)]
struct Cli {
    /// Config file (defaults to $PERMUSAGE_CONFIG, then ~/.config/permusage/permusage.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the permission usage tree for a snapshot
    View(ViewArgs),

    /// List the permission and time filters available for a snapshot
    Filters {
        /// Snapshot JSON file
        snapshot: PathBuf,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the effective configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let config_override = cli.config.as_deref();

    let result = match &cli.command {
        Commands::View(args) => view_cmd::run_view(args, config_override),
        Commands::Filters { snapshot, format } => {
            view_cmd::run_filters(snapshot, *format, config_override)
        }
        Commands::Config => config::show_config(config_override),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
