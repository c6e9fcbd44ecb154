use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use yolo_stage::acquire::download::{acquire_via_download, HttpFetcher};
use yolo_stage::acquire::toolkit::{acquire_via_toolkit, ExportRequest, PythonToolkit};
use yolo_stage::config::{Config, DEFAULT_PYTHON};
use yolo_stage::report;
use yolo_stage::stage::Staged;

#[derive(Parser, Debug)]
#[command(name = "yolo-stage", about = "Fetch a pretrained YOLO model and stage it into the app's assets")]
struct Cli {
    /// Optional path to a config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory the toolkit runs in and the assets path is resolved against
    #[arg(long, global = true)]
    workdir: Option<PathBuf>,

    /// Assets directory of the app (must already exist)
    #[arg(long, global = true)]
    assets_dir: Option<PathBuf>,

    /// Model name, e.g. yolov8n
    #[arg(long, global = true)]
    model: Option<String>,

    /// Print debug diagnostics
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch the checkpoint with Ultralytics and export it (ONNX by default)
    Export {
        #[arg(long)]
        python: Option<String>,
        #[arg(long)]
        format: Option<String>,
        #[arg(long)]
        imgsz: Option<u32>,
        #[arg(long)]
        opset: Option<u32>,
        #[arg(long)]
        no_simplify: bool,
    },
    /// Download a pre-converted TFLite model, trying each source in turn
    Download {
        /// Source URL; repeat to give several. Replaces the default list.
        #[arg(long = "url")]
        urls: Vec<String>,
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let verbose = cli.verbose;
    let hints: fn() = match &cli.command {
        Commands::Export { .. } => report::export_hints,
        Commands::Download { .. } => report::download_hints,
    };

    match run(cli).await {
        Ok(()) => {
            report::next_steps();
            ExitCode::SUCCESS
        }
        Err(err) => {
            if verbose { report::fail(&format!("{err:?}")) } else { report::fail(&format!("{err:#}")) }
            hints();
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // CLI flags win over the config file
    let mut cfg = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if cli.model.is_some() { cfg.model = cli.model; }
    if cli.assets_dir.is_some() { cfg.assets_dir = cli.assets_dir; }

    let workdir = match cli.workdir {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolving working directory")?,
    };

    match cli.command {
        Commands::Export { python, format, imgsz, opset, no_simplify } => {
            if format.is_some() { cfg.export_format = format; }
            if imgsz.is_some() { cfg.imgsz = imgsz; }
            if opset.is_some() { cfg.opset = opset; }
            if no_simplify { cfg.simplify = Some(false); }
            if python.is_some() { cfg.python = python; }
            export_cmd(&cfg, &workdir)
        }
        Commands::Download { urls, timeout_secs } => {
            if !urls.is_empty() { cfg.urls = Some(urls); }
            if timeout_secs.is_some() { cfg.timeout_secs = timeout_secs; }
            download_cmd(&cfg, &workdir).await
        }
    }
}

fn export_cmd(cfg: &Config, workdir: &Path) -> anyhow::Result<()> {
    report::banner("YOLO model export");
    println!("working directory: {}", workdir.display());

    let request = ExportRequest::from_config(cfg);
    let toolkit = PythonToolkit::new(cfg.python.as_deref().unwrap_or(DEFAULT_PYTHON));
    let staged = acquire_via_toolkit(&toolkit, &request, workdir, &cfg.assets_dir(workdir))?;
    print_staged(&staged);
    Ok(())
}

async fn download_cmd(cfg: &Config, workdir: &Path) -> anyhow::Result<()> {
    report::banner("YOLO pre-converted model download");

    let fetcher = HttpFetcher::new(cfg.timeout_secs.map(Duration::from_secs))
        .context("building HTTP client")?;
    let dest = cfg.assets_dir(workdir).join(format!("{}.tflite", cfg.model()));
    let staged = acquire_via_download(&fetcher, &cfg.urls(), &dest).await?;
    print_staged(&staged);
    Ok(())
}

fn print_staged(staged: &Staged) {
    if let Some(backup) = &staged.backup {
        println!("previous model kept at {}", backup.display());
    }
    report::ok(&format!(
        "model staged at {} ({})",
        staged.path.display(),
        report::megabytes(staged.size)
    ));
}
