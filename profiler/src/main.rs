//! app-profiler CLI entry point.

use anyhow::{Context, Result};
use app_profiler::{server_profile, Config, HostInfo, Session, SvgChartSink};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "app-profiler")]
#[command(
    version,
    about = "Sample CPU and memory usage of an application and chart the run",
    after_help = "EXAMPLES:
    app-profiler run -- python train.py --epochs 3
    app-profiler run --interval 1 --output ./charts -- make -j8
    app-profiler info
    app-profiler info memory"
)]
struct Cli {
    /// Path to a TOML config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command and chart the CPU and memory usage of its process tree
    Run {
        /// Directory for the chart files
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seconds between samples
        #[arg(short, long)]
        interval: Option<u64>,

        /// Also write a JSON summary next to the charts
        #[arg(long)]
        summary: bool,

        /// Command to profile
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Show CPU core count and memory totals (option: cpu or memory)
    Info { option: Option<String> },
}

fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(Config::config_path);
    if config_path.exists() {
        Config::load(&config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        info!("No config file found, using defaults");
        Config::default()
    }
}

async fn run_command(config: Config, command: &[String]) -> Result<()> {
    let (program, args) = command.split_first().context("No command given")?;

    // Probe setup must not fail after the child is running
    let mut session = Session::linux(&config.sampling)?;

    let mut child = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to start {}", program))?;
    let pid = child.id().context("Child exited before it could be profiled")?;
    session.start_profiling_pid(pid)?;

    let status = child.wait().await?;
    info!("{} exited with {}", program, status);

    let sink = SvgChartSink::new(&config.output);
    let report = session.end_profiling(&sink).await?;

    println!("{}", report.cpu_annotation());
    println!("{}", report.mem_annotation());
    println!("Charts written to {}", config.output.directory.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            output,
            interval,
            summary,
            command,
        } => {
            let mut config = load_config(cli.config.as_deref());
            if let Some(dir) = output {
                config.output.directory = dir;
            }
            if let Some(secs) = interval {
                config.sampling.interval_seconds = secs;
            }
            config.output.write_summary |= summary;
            run_command(config, &command).await
        }
        Commands::Info { option } => {
            let profile = server_profile(&HostInfo::new(), option.as_deref())?;
            println!("{}", profile);
            Ok(())
        }
    }
}
