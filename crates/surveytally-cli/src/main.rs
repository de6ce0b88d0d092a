use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use surveytally_core::config_file::{self, ConfigFile, GeminiConfig, SurveyConfig};
use surveytally_core::rollup::ReportSettings;
use surveytally_core::{ProgressEvent, SurveyBatch, aggregate_stats, run_pipeline};
use surveytally_gemini::GeminiAnalyzer;
use surveytally_pdf_mupdf::MupdfRasterizer;
use surveytally_reporting::{ExportFormat, Report, export_report};

mod output;

use output::ColorMode;

/// Scanned Survey Tally - Aggregate Korean education satisfaction surveys
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process scanned survey files and print the aggregated report
    Run {
        /// Scanned survey files (PDF, PNG, JPEG, or WebP)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Gemini API key
        #[arg(long)]
        api_key: Option<String>,

        /// Gemini model name
        #[arg(long)]
        model: Option<String>,

        /// Pages per respondent (one survey = this many consecutive pages)
        #[arg(long)]
        pages_per_person: Option<u32>,

        /// Planned audience size, used for the participation rate
        #[arg(long)]
        target_audience: Option<u32>,

        /// Write the report to this path as well as printing it
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export format: json, csv, md, or txt (default: inferred from
        /// the output extension, falling back to csv)
        #[arg(long)]
        format: Option<String>,
    },

    /// Manage persistent settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Store values in the platform config file for later runs
    Set {
        /// Gemini API key
        #[arg(long)]
        api_key: Option<String>,

        /// Gemini model name
        #[arg(long)]
        model: Option<String>,

        /// Pages per respondent
        #[arg(long)]
        pages_per_person: Option<u32>,

        /// Planned audience size
        #[arg(long)]
        target_audience: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            files,
            no_color,
            api_key,
            model,
            pages_per_person,
            target_audience,
            output,
            format,
        } => {
            run(
                files,
                no_color,
                api_key,
                model,
                pages_per_person,
                target_audience,
                output,
                format,
            )
            .await
        }
        Command::Config(ConfigCommand::Set {
            api_key,
            model,
            pages_per_person,
            target_audience,
        }) => config_set(api_key, model, pages_per_person, target_audience),
    }
}

/// Merge the given values over the platform config file and save it back.
fn config_set(
    api_key: Option<String>,
    model: Option<String>,
    pages_per_person: Option<u32>,
    target_audience: Option<u32>,
) -> anyhow::Result<()> {
    if api_key.is_none()
        && model.is_none()
        && pages_per_person.is_none()
        && target_audience.is_none()
    {
        anyhow::bail!(
            "Nothing to set. Pass --api-key, --model, --pages-per-person, or --target-audience."
        );
    }

    let base = config_file::config_path()
        .and_then(|p| config_file::load_from_path(&p))
        .unwrap_or_default();
    let overlay = ConfigFile {
        survey: Some(SurveyConfig {
            pages_per_person,
            target_audience,
        }),
        gemini: Some(GeminiConfig { api_key, model }),
    };
    let merged = config_file::merge(base, overlay);

    let path = config_file::save_config(&merged).map_err(|e| anyhow::anyhow!(e))?;
    println!("Config saved to: {}", path.display());
    Ok(())
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run(
    files: Vec<PathBuf>,
    no_color: bool,
    api_key: Option<String>,
    model: Option<String>,
    pages_per_person: Option<u32>,
    target_audience: Option<u32>,
    output: Option<PathBuf>,
    format: Option<String>,
) -> anyhow::Result<()> {
    // Resolve configuration: CLI flags > env vars > config file > defaults
    let config = config_file::load_config();

    let api_key = api_key
        .or_else(|| std::env::var("GEMINI_API_KEY").ok())
        .or_else(|| config.gemini.as_ref().and_then(|g| g.api_key.clone()));
    let Some(api_key) = api_key else {
        anyhow::bail!(
            "No Gemini API key. Pass --api-key, set GEMINI_API_KEY, or add it to the config file."
        );
    };
    let model = model.or_else(|| config.gemini.as_ref().and_then(|g| g.model.clone()));

    let settings = ReportSettings {
        pages_per_person: pages_per_person
            .or_else(|| config.survey.as_ref().and_then(|s| s.pages_per_person))
            .unwrap_or(1),
        target_audience: target_audience
            .or_else(|| config.survey.as_ref().and_then(|s| s.target_audience))
            .unwrap_or(0),
    };

    let color = ColorMode(!no_color);

    // Intake
    let mut batch = SurveyBatch::new();
    for path in &files {
        if !path.exists() {
            anyhow::bail!("File not found: {}", path.display());
        }
        let Some(mime) = mime_for_path(path) else {
            anyhow::bail!(
                "Unsupported file type: {} (expected pdf, png, jpg, or webp)",
                path.display()
            );
        };
        let data = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        batch.add_document(file_name, mime, data);
    }

    let rasterizer = MupdfRasterizer::new();
    let analyzer = match &model {
        Some(m) => GeminiAnalyzer::new(&api_key).with_model(m),
        None => GeminiAnalyzer::new(&api_key),
    };

    // Spinner on stderr; the report itself goes to stdout.
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let progress_cb = |event: ProgressEvent| {
        output::update_progress(&spinner, &event, color);
    };

    run_pipeline(&mut batch, &rasterizer, &analyzer, progress_cb, cancel).await;
    spinner.finish_and_clear();

    // Aggregate whatever completed, cancelled or not.
    let stats = aggregate_stats(&batch.documents);
    let report = Report::build(&batch.documents, stats, &settings);

    let mut stdout = std::io::stdout();
    output::print_report(&mut stdout, &report, color)?;

    if let Some(output_path) = output {
        let format = resolve_format(format.as_deref(), &output_path)?;
        export_report(&report, format, &output_path).map_err(|e| anyhow::anyhow!(e))?;
        writeln!(stdout, "\nReport saved to: {}", output_path.display())?;
    }

    Ok(())
}

fn resolve_format(explicit: Option<&str>, path: &Path) -> anyhow::Result<ExportFormat> {
    if let Some(name) = explicit {
        return ExportFormat::from_str(name).map_err(|e| anyhow::anyhow!(e));
    }
    let inferred = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(|e| ExportFormat::from_str(e).ok());
    Ok(inferred.unwrap_or(ExportFormat::Csv))
}
