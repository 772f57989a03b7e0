use std::io::Write;

use anyhow::Result;
use permusage_core::{DisplayEntry, FilterOptions, UsageEntry, UsageView};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Filter state shown alongside a rendered view.
#[derive(Debug, serde::Serialize)]
pub struct ViewHeader<'a> {
    pub group: &'a str,
    pub time: &'a str,
    pub show_system: bool,
}

/// Structured JSON document for `view --format json`.
#[derive(Debug, serde::Serialize)]
struct ViewDocument<'a> {
    version: &'static str,
    filters: &'a ViewHeader<'a>,
    has_system_apps: bool,
    entries: &'a [DisplayEntry],
}

pub fn render_view(
    view: &UsageView,
    header: &ViewHeader<'_>,
    format: OutputFormat,
    writer: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let doc = ViewDocument {
                version: "0.1",
                filters: header,
                has_system_apps: view.has_system_apps,
                entries: &view.tree,
            };
            writeln!(writer, "{}", serde_json::to_string_pretty(&doc)?)?;
        }
        OutputFormat::Text => render_view_text(view, header, writer)?,
    }
    Ok(())
}

fn render_view_text(
    view: &UsageView,
    header: &ViewHeader<'_>,
    writer: &mut dyn Write,
) -> Result<()> {
    writeln!(writer, "Permission usage ({} / {})", header.group, header.time)?;
    writeln!(writer, "{}", "─".repeat(50))?;

    if view.tree.is_empty() {
        writeln!(writer, "No permission usage found.")?;
    }
    for entry in &view.tree {
        match entry {
            DisplayEntry::Single(row) => write_row(writer, row, "")?,
            DisplayEntry::Grouped(group) => {
                writeln!(writer, "{} ({} permissions)", group.title, group.children.len())?;
                for row in &group.children {
                    write_row(writer, row, "  ")?;
                }
            }
        }
    }

    if view.has_system_apps && !header.show_system {
        writeln!(writer)?;
        writeln!(writer, "System apps hidden. Pass --show-system to include them.")?;
    }
    Ok(())
}

fn write_row(writer: &mut dyn Write, row: &UsageEntry, indent: &str) -> Result<()> {
    if indent.is_empty() {
        writeln!(writer, "{:<32} {}", row.title, row.summary)?;
    } else {
        writeln!(writer, "{indent}{}", row.summary)?;
    }
    Ok(())
}

pub fn render_filters(
    options: &FilterOptions,
    format: OutputFormat,
    writer: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Json => writeln!(writer, "{}", serde_json::to_string_pretty(options)?)?,
        OutputFormat::Text => {
            writeln!(writer, "Permission filters:")?;
            for (index, option) in options.group_options.iter().enumerate() {
                writeln!(writer, "  [{index}] {}", option.label)?;
            }
            writeln!(writer, "Time filters:")?;
            for (index, option) in options.time_options.iter().enumerate() {
                writeln!(writer, "  [{index}] {} ({})", option.label, option.window)?;
            }
        }
    }
    Ok(())
}
