use anyhow::{Context, Result};
use clap::Parser;
use sheetprobe_core::config::CONFIG_FILE_NAME;
use sheetprobe_core::{Inspection, Inspector, InspectorConfig};
use std::backtrace::BacktraceStatus;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod report;

#[derive(Parser)]
#[command(name = "sheetprobe")]
#[command(about = "Print a diagnostic report for an Excel template", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the template workbook (defaults to the configured template)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Worksheet to inspect in detail
    #[arg(short, long, value_name = "NAME")]
    sheet: Option<String>,

    /// Cells to probe, e.g. D3 B11
    #[arg(long, value_name = "CELL", num_args = 1..)]
    cells: Option<Vec<String>>,

    /// Number of rows scanned for explicit heights
    #[arg(long, value_name = "N")]
    rows: Option<u32>,

    /// Number of columns scanned for explicit widths
    #[arg(long, value_name = "N")]
    cols: Option<u32>,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Command line flags take precedence over the configuration file
    fn apply_overrides(&self, config: &mut InspectorConfig) {
        if let Some(file) = &self.file {
            config.template = file.clone();
        }
        if let Some(sheet) = &self.sheet {
            config.target_sheet = sheet.clone();
        }
        if let Some(cells) = &self.cells {
            config.probe_cells = cells.clone();
        }
        if let Some(rows) = self.rows {
            config.max_row = rows;
        }
        if let Some(cols) = self.cols {
            config.max_column = cols;
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", describe_error(&err));
            ExitCode::FAILURE
        }
    }
}

/// Error message, one cause per line, followed by the stack trace when captured
fn describe_error(err: &anyhow::Error) -> String {
    let mut text = err.to_string();
    for cause in err.chain().skip(1) {
        text.push_str(&format!("\n  caused by: {}", cause));
    }

    let backtrace = err.backtrace();
    if backtrace.status() == BacktraceStatus::Captured {
        text.push_str(&format!("\n\nstack backtrace:\n{}", backtrace));
    } else {
        text.push_str("\n\nrun with RUST_BACKTRACE=1 for a stack backtrace");
    }
    text
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = load_config(cli)?;
    cli.apply_overrides(&mut config);
    debug!(?config, "effective configuration");

    let inspector = Inspector::with_config(config);
    let inspection = inspector.inspect().with_context(|| {
        format!(
            "Failed to inspect template: {}",
            inspector.config().template.display()
        )
    })?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match inspection {
        Inspection::Missing { path } => report::write_missing(&mut out, &path)?,
        Inspection::Report(report) => report::write_report(&mut out, &report)?,
    }
    out.flush()?;

    Ok(())
}

fn load_config(cli: &Cli) -> Result<InspectorConfig> {
    if let Some(config_path) = &cli.config {
        return InspectorConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()));
    }

    // Try to load default config from current directory if it exists
    let default_config_path = PathBuf::from(CONFIG_FILE_NAME);
    if default_config_path.exists() {
        InspectorConfig::from_file(&default_config_path).with_context(|| {
            format!(
                "Failed to load config from {}",
                default_config_path.display()
            )
        })
    } else {
        Ok(InspectorConfig::default())
    }
}
