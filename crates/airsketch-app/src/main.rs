//! Replay a recorded pen session and export the drawing.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Instant, SystemTime};

use airsketch_app::{App, AppConfig, AppError, replay};
use airsketch_core::BoundsPolicy;
use airsketch_core::settings::{FileStore, KeyValueStore, MemoryStore, SettingsError};
use clap::{Parser, ValueEnum};
use kurbo::Size;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Replay(#[from] replay::ReplayError),
    #[error("settings: {0}")]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    App(#[from] AppError),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    /// 60x90 box around the first point, grown as the pen moves.
    DefaultBox,
    /// 0.69x0.59 box around the first point.
    RealWorldPaper,
}

impl From<Policy> for BoundsPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::DefaultBox => BoundsPolicy::DefaultBox,
            Policy::RealWorldPaper => BoundsPolicy::RealWorldPaper,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "airsketch", about = "Replay a smart-pen session and export it as PNG and EPS")]
struct Cli {
    /// JSON-lines pen event log, or `-` for stdin.
    events: PathBuf,

    /// Directory for exported files.
    #[arg(long, short, default_value = ".")]
    out: PathBuf,

    /// Write a PNG. With neither --png nor --eps both are written.
    #[arg(long)]
    png: bool,

    /// Write an EPS page.
    #[arg(long)]
    eps: bool,

    /// Canvas container width in CSS pixels.
    #[arg(long, default_value_t = 592.0)]
    width: f64,

    /// Canvas container height in CSS pixels.
    #[arg(long, default_value_t = 840.0)]
    height: f64,

    /// Canvas pixels per CSS pixel.
    #[arg(long, default_value_t = 2.0)]
    dpr: f64,

    #[arg(long, value_enum, default_value = "default-box")]
    policy: Policy,

    /// Forward every accepted dot as OSC over UDP.
    #[arg(long, env = "AIRSKETCH_TELEMETRY")]
    telemetry: bool,

    #[arg(long, env = "AIRSKETCH_TELEMETRY_HOST", default_value = "127.0.0.1")]
    telemetry_host: String,

    #[arg(long, env = "AIRSKETCH_TELEMETRY_PORT")]
    telemetry_port: Option<String>,

    /// Settings file. Without it settings live in memory for this run only.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Use the settings file in the user's config directory.
    #[arg(long, conflicts_with = "settings")]
    user_settings: bool,
}

fn open_store(cli: &Cli) -> Result<Box<dyn KeyValueStore>, CliError> {
    if let Some(path) = &cli.settings {
        return Ok(Box::new(FileStore::open(path.clone())?));
    }
    if cli.user_settings {
        let store = FileStore::default_location()?;
        log::info!("Using settings at {}", store.path().display());
        return Ok(Box::new(store));
    }
    Ok(Box::new(MemoryStore::new()))
}

fn read_log(path: &Path) -> Result<Vec<airsketch_core::PenEvent>, CliError> {
    if path.as_os_str() == "-" {
        return Ok(replay::read_events(io::stdin().lock())?);
    }
    let file = File::open(path).map_err(|source| CliError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(replay::read_events(BufReader::new(file))?)
}

fn run(cli: Cli) -> Result<(), CliError> {
    let events = read_log(&cli.events)?;

    let config = AppConfig {
        container: Size::new(cli.width, cli.height),
        device_pixel_ratio: cli.dpr,
        bounds_policy: cli.policy.into(),
        telemetry_host: cli.telemetry_host.clone(),
        export_dir: cli.out.clone(),
        ..AppConfig::default()
    };
    let mut app = App::new(config, open_store(&cli)?)?;

    if let Some(port) = &cli.telemetry_port {
        app.set_telemetry_port(port);
    }
    if cli.telemetry {
        app.set_telemetry_enabled(true);
    }

    let delivered = replay::feed(&app.pen_sender(), events);
    app.tick(Instant::now());

    let session = app.session();
    let bounds = session.bounds();
    log::info!(
        "Replayed {delivered} event(s): {} stroke(s), {} point(s), bounds x {:.2}..{:.2} y {:.2}..{:.2}",
        session.history().len(),
        session.history().point_count(),
        bounds.x_min,
        bounds.x_max,
        bounds.y_min,
        bounds.y_max
    );
    if app.telemetry().is_enabled() {
        log::info!(
            "Telemetry: {} sent, {} dropped",
            app.telemetry().sent(),
            app.telemetry().dropped()
        );
    }

    let both = !cli.png && !cli.eps;
    let now = SystemTime::now();
    let mut results = Vec::new();
    if cli.png || both {
        results.push(app.export_png(now));
    }
    if cli.eps || both {
        results.push(app.export_eps(now));
    }

    // Export problems are reported, not fatal.
    for result in results {
        match result {
            Ok(path) => println!("{}", path.display()),
            Err(e) => eprintln!("Export failed: {e}"),
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("airsketch: {e}");
            ExitCode::FAILURE
        }
    }
}
