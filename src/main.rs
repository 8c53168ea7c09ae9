// Entry point and high-level CLI flow.
//
// With a subcommand the binary ingests the given CSV files and writes the
// requested artifacts. Without one it runs the interactive menu:
// - Option [1] loads intake/outcome CSVs, printing diagnostics.
// - Option [2] generates every report into the output directory.
// - After generating reports, the user can go back to the menu or exit.
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use once_cell::sync::Lazy;
use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use smartpaws_analytics::output::{self, ReportBundle};
use smartpaws_analytics::service::HttpPredictionService;
use smartpaws_analytics::util::format_int;
use smartpaws_analytics::{reports, Analytics, Config, LoadReport, MemoryStore, RecordStore};

#[derive(Parser)]
#[command(name = "smartpaws_analytics", about = "Shelter intake/outcome analytics")]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Flags that take precedence over `SMARTPAWS_*` environment variables.
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Prediction service base URL (e.g. "http://localhost:8000")
    #[arg(long, global = true)]
    ml_url: Option<String>,
    /// Seconds to wait for the prediction service before falling back
    #[arg(long, global = true)]
    ml_timeout_secs: Option<u64>,
    /// Records per store write
    #[arg(long, global = true)]
    batch_size: Option<usize>,
    /// Maximum batch writes in flight
    #[arg(long, global = true)]
    concurrency: Option<usize>,
    /// Directory for generated artifacts
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest files and write every artifact
    Report(FileArgs),
    /// Ingest intake files and write the region × year heatmap
    Heatmap(FileArgs),
    /// Ingest outcome files and write the 12-month adoption forecast
    Forecast {
        #[command(flatten)]
        files: FileArgs,
        /// Forecast starts the month after this day (YYYY-MM-DD); defaults to today
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Write the hotspot list
    Hotspots(FileArgs),
    /// Ingest files and report record counts
    Status(FileArgs),
}

#[derive(Args)]
struct FileArgs {
    /// CSV files; names must contain "intake" or "outcome"
    files: Vec<PathBuf>,
}

impl Overrides {
    fn apply(self, mut cfg: Config) -> Config {
        if let Some(url) = self.ml_url {
            cfg.ml_url = Some(url);
        }
        if let Some(secs) = self.ml_timeout_secs.filter(|s| *s > 0) {
            cfg.ml_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = self.batch_size.filter(|n| *n > 0) {
            cfg.batch_size = n;
        }
        if let Some(n) = self.concurrency.filter(|n| *n > 0) {
            cfg.max_concurrent_batches = n;
        }
        if let Some(dir) = self.output_dir {
            cfg.output_dir = dir;
        }
        cfg
    }
}

// Loaded records live for the whole interactive session so reports can be
// generated repeatedly without reloading.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        store: Arc::new(MemoryStore::new()),
        loads: Vec::new(),
    })
});

struct AppState {
    store: Arc<MemoryStore>,
    loads: Vec<LoadReport>,
}

fn app_state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

fn build_analytics(cfg: &Config, store: Arc<MemoryStore>) -> Analytics {
    let analytics = Analytics::new(store);
    let Some(url) = cfg.ml_url.as_deref() else {
        return analytics;
    };
    match HttpPredictionService::new(url, cfg.ml_timeout) {
        Ok(service) => analytics.with_service(Arc::new(service), cfg.ml_timeout),
        Err(e) => {
            log::warn!("Prediction service disabled: {e}");
            analytics
        }
    }
}

fn print_load(path: &Path, report: &LoadReport) {
    println!(
        "Processing {} ({} rows read, {} {} records written)",
        path.display(),
        format_int(report.total_rows),
        format_int(report.written),
        report.kind
    );
    if report.row_errors > 0 {
        println!(
            "Note: {} rows skipped due to parse/validation errors.",
            format_int(report.row_errors)
        );
    }
    if report.unparsed_dates > 0 {
        println!(
            "Note: {} records kept without a parsable date.",
            format_int(report.unparsed_dates)
        );
    }
    if report.failed_batches > 0 {
        println!(
            "Warning: {} batch writes failed.",
            format_int(report.failed_batches)
        );
    }
}

async fn load(
    store: &dyn RecordStore,
    cfg: &Config,
    files: &[PathBuf],
) -> Result<Vec<LoadReport>, Box<dyn Error>> {
    let loads = smartpaws_analytics::ingest_files(store, files, &cfg.load_options()).await?;
    for (path, report) in files.iter().zip(&loads) {
        print_load(path, report);
    }
    println!();
    Ok(loads)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn generate_all(analytics: &Analytics, cfg: &Config) -> Result<(), Box<dyn Error>> {
    println!("Generating reports...");
    let bundle = ReportBundle {
        heatmap: analytics.heatmap().await?,
        forecast: analytics.forecast(today()).await?,
        hotspots: analytics.hotspots().await?,
        status: analytics.status().await?,
    };
    let written = output::write_reports(&cfg.output_dir, &bundle)?;

    println!("Region Risk Summary\n");
    output::preview_table_rows(&reports::region_rows(&bundle.heatmap), 5);
    println!("Adoption Forecast (source: {})\n", bundle.forecast.data_source);
    output::preview_table_rows(&reports::forecast_rows(&bundle.forecast), 3);
    println!("Hotspots (source: {})\n", bundle.hotspots.data_source);
    output::preview_table_rows(&reports::hotspot_rows(&bundle.hotspots), 3);

    for path in written {
        println!("(Exported {})", path.display());
    }
    println!();
    Ok(())
}

async fn run_command(command: Commands, cfg: &Config) -> Result<(), Box<dyn Error>> {
    let store = Arc::new(MemoryStore::new());
    let analytics = build_analytics(cfg, store.clone());
    let dir = cfg.output_dir.as_path();

    match command {
        Commands::Report(args) => {
            load(&*store, cfg, &args.files).await?;
            generate_all(&analytics, cfg).await?;
        }
        Commands::Heatmap(args) => {
            load(&*store, cfg, &args.files).await?;
            let heatmap = analytics.heatmap().await?;
            let rows = reports::region_rows(&heatmap);
            output::preview_table_rows(&rows, rows.len());
            let json = output::write_artifact(dir, output::HEATMAP_FILE, &heatmap)?;
            let csv = dir.join(output::REGION_SUMMARY_FILE);
            output::write_csv(&csv, &rows)?;
            println!("(Exported {} and {})", json.display(), csv.display());
        }
        Commands::Forecast { files, today: day } => {
            load(&*store, cfg, &files.files).await?;
            let forecast = analytics.forecast(day.unwrap_or_else(today)).await?;
            output::preview_table_rows(&reports::forecast_rows(&forecast), 12);
            let path = output::write_artifact(dir, output::FORECAST_FILE, &forecast)?;
            println!("(Exported {})", path.display());
        }
        Commands::Hotspots(args) => {
            load(&*store, cfg, &args.files).await?;
            let hotspots = analytics.hotspots().await?;
            output::preview_table_rows(&reports::hotspot_rows(&hotspots), 8);
            let path = output::write_artifact(dir, output::HOTSPOTS_FILE, &hotspots)?;
            println!("(Exported {})", path.display());
        }
        Commands::Status(args) => {
            load(&*store, cfg, &args.files).await?;
            let status = analytics.status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            output::write_artifact(dir, output::STATUS_FILE, &status)?;
        }
    }
    Ok(())
}

/// Read a single line of input after printing `prompt`.
fn read_line(prompt: &str) -> String {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask the user whether to go back to the menu after generating reports.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        match read_line("Back to Report Selection (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: ingest comma-separated CSV paths into the session store.
async fn handle_load(cfg: &Config) {
    let input = read_line("CSV files (comma-separated): ");
    let files: Vec<PathBuf> = input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect();
    if files.is_empty() {
        println!("No files given.\n");
        return;
    }
    let store = app_state().store.clone();
    match load(&*store, cfg, &files).await {
        Ok(loads) => app_state().loads.extend(loads),
        Err(e) => eprintln!("Failed to load files: {e}\n"),
    }
}

/// Handle option [2]: generate every artifact from what has been loaded.
async fn handle_generate_reports(cfg: &Config) {
    let (store, loaded) = {
        let state = app_state();
        (state.store.clone(), !state.loads.is_empty())
    };
    if !loaded {
        println!("Error: No data loaded. Please load the CSV files first (option 1).\n");
        return;
    }
    let analytics = build_analytics(cfg, store);
    if let Err(e) = generate_all(&analytics, cfg).await {
        eprintln!("Report error: {e}\n");
    }
}

async fn interactive(cfg: &Config) {
    loop {
        println!("SmartPaws Analytics:");
        println!("[1] Load intake/outcome files");
        println!("[2] Generate Reports\n");
        match read_line("Enter choice: ").as_str() {
            "1" => handle_load(cfg).await,
            "2" => {
                println!();
                handle_generate_reports(cfg).await;
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1 or 2.\n"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let cfg = cli.overrides.apply(Config::from_env());
    log::debug!("Config: {cfg:?}");

    match cli.command {
        Some(command) => run_command(command, &cfg).await,
        None => {
            interactive(&cfg).await;
            Ok(())
        }
    }
}
