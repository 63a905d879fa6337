use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use lode::{LodeConfig, LodeError, demo};
use lode_runtime::{Runtime, available_workers};

#[derive(Parser, Debug)]
#[command(name = "lode", about = "Headless run of the incremental world-mesh pipeline")]
struct Cli {
    /// TOML config with optional [renderer] and [demo] tables
    #[arg(long)]
    config: Option<PathBuf>,
    /// Render distance in columns
    #[arg(long)]
    view_distance: Option<i32>,
    /// Frames to simulate
    #[arg(long)]
    frames: Option<u32>,
    /// World seed
    #[arg(long)]
    seed: Option<i32>,
    /// Columns streamed in around the origin
    #[arg(long)]
    radius: Option<i32>,
    /// Mesh worker threads (default: all cores)
    #[arg(long)]
    workers: Option<usize>,
}

impl Cli {
    fn load_config(&self) -> Result<LodeConfig, LodeError> {
        let mut cfg = match &self.config {
            Some(path) => LodeConfig::load_from_path(path)?,
            None => LodeConfig::default(),
        };
        if let Some(v) = self.view_distance {
            cfg.renderer.view_distance = v;
        }
        if let Some(v) = self.frames {
            cfg.demo.frames = v;
        }
        if let Some(v) = self.seed {
            cfg.demo.seed = v;
        }
        if let Some(v) = self.radius {
            cfg.demo.radius = v;
        }
        cfg.renderer.validate()?;
        Ok(cfg)
    }
}

fn run(cli: &Cli) -> Result<(), LodeError> {
    let cfg = cli.load_config()?;
    let workers = cli.workers.unwrap_or_else(available_workers);
    let pool = Arc::new(Runtime::new(workers)?);
    let summary = demo::run(&cfg, pool.clone())?;
    log::info!(target: "demo", "pool at exit: {:?}", pool.counts());
    println!("{summary}");
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
