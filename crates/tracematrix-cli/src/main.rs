use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use tracematrix_core::config_file::{self, ConfigFile};
use tracematrix_core::{
    CoverageStatus, ExtractionResult, PageMargins, RequirementSet, TraceLabelPolicy, reconcile,
};
use tracematrix_parsing::{ParserConfig, ParserConfigBuilder};
use tracematrix_reporting::ExportFormat;

mod output;

use output::ColorMode;

/// Environment variable overriding the requirement id prefix.
const PREFIX_ENV: &str = "TRACEMATRIX_PREFIX";

/// Test protocol traceability - extract test cases from protocol PDFs and
/// check them against the SW requirement set
#[derive(Parser, Debug)]
#[command(name = "tracematrix", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Write the result to a file; the format follows the extension
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Output format: csv, json, markdown or text
    #[arg(long, global = true)]
    format: Option<ExportFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Read settings from this TOML file instead of the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Requirement id prefix, e.g. RCM_SW matches RCM_SW-123
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// How a `Trace:` line is treated: marker, ends-scenario or continuation
    #[arg(long, global = true)]
    trace_label: Option<TraceLabelPolicy>,

    /// Keep a dangling "Trace" word at the end of scenario text
    #[arg(long, global = true)]
    keep_trace_artifact: bool,

    /// Discard text that precedes the first `Scenario:` label
    #[arg(long, global = true)]
    drop_leading_record: bool,

    /// Ignore this fraction of each PDF page's height at the top (e.g. 0.08)
    #[arg(long, global = true)]
    header_exclusion: Option<f32>,

    /// Ignore this fraction of each PDF page's height at the bottom (e.g. 0.08)
    #[arg(long, global = true)]
    footer_exclusion: Option<f32>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract test cases (scenario, id, trace) from a test protocol
    Extract {
        /// Path to the protocol PDF or text dump
        protocol: PathBuf,

        /// One row per traced requirement instead of one per test case
        #[arg(long)]
        explode: bool,
    },

    /// List the requirement ids found in a requirements specification
    Requirements {
        /// Path to the SRS PDF or text dump
        srs: PathBuf,
    },

    /// Build the requirement traceability matrix and coverage summary
    Matrix {
        /// Path to the SRS PDF or text dump
        srs: PathBuf,

        /// Path to the protocol PDF or text dump
        protocol: PathBuf,

        /// Only show rows with these statuses (comma-separated: tested, not-covered)
        #[arg(long, value_delimiter = ',')]
        status: Vec<CoverageStatus>,
    },
}

/// Settings resolved from flags, environment and config files.
struct Settings {
    parser: ParserConfig,
    margins: PageMargins,
    /// `None` means human-readable terminal output.
    format: Option<ExportFormat>,
    output: Option<PathBuf>,
    /// One row per traced requirement in test-case output.
    explode: bool,
    color: ColorMode,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    setup_logging(cli.global.verbose);

    let file_config = match &cli.global.config {
        Some(path) => config_file::load_explicit(path)?,
        None => config_file::load_config(),
    };
    let settings = resolve_settings(&cli.global, &file_config)?;

    match cli.command {
        Command::Extract { protocol, explode } => {
            let explode = explode || settings.explode;
            extract(protocol, explode, &settings).await
        }
        Command::Requirements { srs } => requirements(srs, &settings).await,
        Command::Matrix {
            srs,
            protocol,
            status,
        } => matrix(srs, protocol, status, &settings).await,
    }
}

fn setup_logging(verbosity: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn resolve_settings(args: &GlobalArgs, file: &ConfigFile) -> anyhow::Result<Settings> {
    // Resolve configuration: CLI flags > env vars > config file > defaults
    let parsing = file.parsing.clone().unwrap_or_default();
    let prefix = args
        .prefix
        .clone()
        .or_else(|| std::env::var(PREFIX_ENV).ok())
        .filter(|p| !p.trim().is_empty());

    let mut builder = ParserConfigBuilder::new().policy(file.extraction_policy());
    builder = match (prefix, parsing.requirement_pattern, parsing.requirement_prefix) {
        (Some(prefix), _, _) => builder.requirement_prefix(&prefix),
        (None, Some(pattern), _) => builder.requirement_regex(&pattern),
        (None, None, Some(prefix)) => builder.requirement_prefix(&prefix),
        (None, None, None) => builder,
    };
    if let Some(policy) = args.trace_label {
        builder = builder.trace_label(policy);
    }
    if args.keep_trace_artifact {
        builder = builder.strip_trailing_trace_artifact(false);
    }
    if args.drop_leading_record {
        builder = builder.keep_leading_record(false);
    }
    let parser = builder
        .build()
        .context("invalid requirement id pattern")?;

    let file_margins = file.page_margins();
    let margins = PageMargins {
        header: args.header_exclusion.unwrap_or(file_margins.header),
        footer: args.footer_exclusion.unwrap_or(file_margins.footer),
    };
    if !margins.is_valid() {
        anyhow::bail!(
            "header/footer exclusion must be fractions in [0, 1) that leave part of the page (got {} and {})",
            margins.header,
            margins.footer
        );
    }

    let config_format = match file.export.as_ref().and_then(|e| e.format.as_deref()) {
        Some(raw) => Some(raw.parse::<ExportFormat>().map_err(anyhow::Error::msg)?),
        None => None,
    };
    let format = args
        .format
        .or_else(|| args.output.as_deref().and_then(ExportFormat::from_path))
        .or(config_format);

    let config_color = file.display.as_ref().and_then(|d| d.color).unwrap_or(true);
    let use_color = !args.no_color && args.output.is_none() && format.is_none() && config_color;

    Ok(Settings {
        parser,
        margins,
        format: format.or_else(|| args.output.as_ref().map(|_| ExportFormat::default())),
        output: args.output.clone(),
        explode: file.extraction_policy().explode_on_export,
        color: ColorMode(use_color),
    })
}

/// Write rendered export content to the output file, or to `out`.
fn emit(content: &str, output: Option<&Path>, out: &mut dyn Write) -> anyhow::Result<()> {
    match output {
        Some(path) => tracematrix_reporting::write_export(content, path)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => out.write_all(content.as_bytes())?,
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

async fn load_test_cases(
    path: PathBuf,
    config: ParserConfig,
    margins: PageMargins,
) -> anyhow::Result<ExtractionResult> {
    let display = path.display().to_string();
    tokio::task::spawn_blocking(move || {
        tracematrix_ingest::extract_test_cases(&path, &config, margins)
    })
    .await?
    .with_context(|| format!("failed to extract test cases from {}", display))
}

async fn load_requirements(
    path: PathBuf,
    config: ParserConfig,
    margins: PageMargins,
) -> anyhow::Result<RequirementSet> {
    let display = path.display().to_string();
    tokio::task::spawn_blocking(move || {
        tracematrix_ingest::extract_requirements(&path, &config, margins)
    })
    .await?
    .with_context(|| format!("failed to extract requirements from {}", display))
}

async fn extract(protocol: PathBuf, explode: bool, settings: &Settings) -> anyhow::Result<()> {
    let name = file_name(&protocol);
    let bar = spinner(format!("Extracting test cases from {}...", name));
    let result = load_test_cases(protocol, settings.parser.clone(), settings.margins).await;
    bar.finish_and_clear();
    let result = result?;

    let mut stdout = std::io::stdout().lock();
    let mut stderr = std::io::stderr();
    report_test_cases(&name, &result, explode, settings, &mut stdout, &mut stderr)
}

/// Render extracted test cases. When an export format is selected the
/// empty-result notice goes to `err` and the (possibly empty) export is
/// still written.
fn report_test_cases(
    name: &str,
    result: &ExtractionResult,
    explode: bool,
    settings: &Settings,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> anyhow::Result<()> {
    match settings.format {
        Some(format) => {
            if result.records.is_empty() {
                output::print_no_test_cases(err, settings.color)?;
            }
            let content =
                tracematrix_reporting::export_test_cases(&result.records, format, explode)?;
            emit(&content, settings.output.as_deref(), out)?;
        }
        None if result.records.is_empty() => output::print_no_test_cases(out, settings.color)?,
        None => {
            output::print_extraction_summary(out, name, &result.stats, settings.color)?;
            if explode {
                output::print_mappings(out, &result.records, settings.color)?;
            } else {
                output::print_test_cases(out, &result.records, settings.color)?;
            }
        }
    }
    Ok(())
}

async fn requirements(srs: PathBuf, settings: &Settings) -> anyhow::Result<()> {
    let name = file_name(&srs);
    let bar = spinner(format!("Extracting requirement ids from {}...", name));
    let result = load_requirements(srs, settings.parser.clone(), settings.margins).await;
    bar.finish_and_clear();
    let set = result?;

    if set.ids.is_empty() {
        tracing::warn!(file = %name, "no requirement ids found");
    }

    match settings.format {
        Some(format) => {
            let content = tracematrix_reporting::export_requirements(&set.ids, format)?;
            emit(&content, settings.output.as_deref(), &mut std::io::stdout())?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            output::print_extraction_summary(&mut stdout, &name, &set.stats, settings.color)?;
            output::print_requirements(&mut stdout, &set.ids, settings.color)?;
        }
    }
    Ok(())
}

async fn matrix(
    srs: PathBuf,
    protocol: PathBuf,
    status: Vec<CoverageStatus>,
    settings: &Settings,
) -> anyhow::Result<()> {
    let statuses = if status.is_empty() {
        vec![CoverageStatus::Tested, CoverageStatus::NotCovered]
    } else {
        status
    };

    let bar = spinner(format!(
        "Extracting {} and {}...",
        file_name(&srs),
        file_name(&protocol)
    ));
    let loaded = tokio::try_join!(
        load_requirements(srs, settings.parser.clone(), settings.margins),
        load_test_cases(protocol, settings.parser.clone(), settings.margins),
    );
    bar.finish_and_clear();
    let (master, cases) = loaded?;

    // Warnings go to stderr so exported content on stdout stays clean
    let mut stderr = std::io::stderr();
    if cases.records.is_empty() {
        output::print_no_test_cases(&mut stderr, settings.color)?;
    }

    let report = reconcile(&master.ids, &cases.records);
    output::print_orphans(&mut stderr, &report.orphans, settings.color)?;

    match settings.format {
        Some(format) => {
            let content = tracematrix_reporting::export_matrix(&report, &statuses, format)?;
            emit(&content, settings.output.as_deref(), &mut std::io::stdout())?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            output::print_matrix(&mut stdout, &report, &statuses, settings.color)?;
        }
    }

    if let Some(path) = &settings.output {
        tracing::info!(path = %path.display(), "wrote traceability matrix");
    }
    Ok(())
}
