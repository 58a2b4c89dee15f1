use clap::Parser;
use rplidar_driver::{run_driver, DriverConfig, Rplidar, RplidarError};
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Reads measurements from an RPLIDAR A1 and prints them as JSON lines.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Cli {
    /// The device path to a serial port.
    port: String,
    #[arg(short, long, default_value_t = 115200)]
    baud: u32,
    /// JSON file with driver settings. The port and baud arguments override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Print whole revolutions instead of single samples.
    #[arg(short, long)]
    revolutions: bool,
    /// Stop after this many samples (or revolutions).
    #[arg(short = 'n', long, default_value_t = 1000)]
    count: usize,
    /// Print device information and health, then exit.
    #[arg(short, long)]
    info: bool,
}

fn load_config(cli: &Cli) -> Result<DriverConfig, Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => serde_json::from_reader(File::open(path)?)?,
        None => DriverConfig::default(),
    };
    Ok(DriverConfig {
        port_name: cli.port.clone(),
        ..config
    }
    .with_baud_rate(cli.baud))
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if cli.info {
        let mut lidar = Rplidar::new(config);
        lidar.connect()?;
        println!("{}", lidar.get_info()?);
        println!("{:?}", lidar.get_health()?);
        return Ok(());
    }

    let (mut lidar, stream) = run_driver(config)?;

    // Stall reports are in-band and never fatal.
    let result: Result<(), RplidarError> = if cli.revolutions {
        stream
            .revolutions()
            .filter(|item| !matches!(item, Err(e) if e.is_stall()))
            .take(cli.count)
            .try_for_each(|revolution| {
                let revolution = revolution?;
                println!("{}", serde_json::to_string(&revolution).unwrap_or_default());
                Ok(())
            })
    } else {
        stream
            .filter(|item| !matches!(item, Err(e) if e.is_stall()))
            .take(cli.count)
            .try_for_each(|sample| {
                let sample = sample?;
                println!("{}", serde_json::to_string(&sample).unwrap_or_default());
                Ok(())
            })
    };

    if let Some(stats) = lidar.stats() {
        info!("{:?}", stats);
    }
    if let Err(e) = lidar.disconnect() {
        warn!("{}", e);
    }
    result?;
    Ok(())
}
