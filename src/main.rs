use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use marvin42_controller::config::{ControllerConfig, LOOP_HZ, MAX_LOOP_HZ};
use marvin42_controller::runtime;
use marvin42_controller::sdk::{LoopbackSdk, ZenohChirp};

/// Steer marvin42 by dragging across the terminal
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON controller configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// SDK app key (overrides the config file)
    #[arg(long)]
    key: Option<String>,

    /// SDK app secret (overrides the config file)
    #[arg(long)]
    secret: Option<String>,

    /// Named protocol from the config file's `protocols` list
    #[arg(long)]
    protocol: Option<String>,

    /// Use the in-memory loopback SDK instead of zenoh
    #[arg(long)]
    loopback: bool,

    /// Frame loop frequency
    #[arg(long, default_value_t = LOOP_HZ, value_parser = clap::value_parser!(u64).range(1..=MAX_LOOP_HZ))]
    loop_hz: u64,
}

fn load_config(args: &Args) -> Result<ControllerConfig, Box<dyn std::error::Error + Send + Sync>> {
    let mut config = match &args.config {
        Some(path) => ControllerConfig::load(path)?,
        None => ControllerConfig::default(),
    };
    if let Some(key) = &args.key {
        config.credentials.key = key.clone();
    }
    if let Some(secret) = &args.secret {
        config.credentials.secret = secret.clone();
    }
    if let Some(protocol) = &args.protocol {
        config.select_protocol(protocol)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug); logs go to stderr, which
    // shares the terminal with the status line, so only warnings by default
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let result = match load_config(&args) {
        Ok(config) if args.loopback => {
            runtime::run(config, LoopbackSdk::new().with_echo(), args.loop_hz).await
        }
        Ok(config) => runtime::run(config, ZenohChirp::new(), args.loop_hz).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Controller error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_hz_range_enforced() {
        let args = Args::try_parse_from(["marvin42-controller"]).unwrap();
        assert_eq!(args.loop_hz, LOOP_HZ);

        assert!(Args::try_parse_from(["marvin42-controller", "--loop-hz", "1000"]).is_ok());
        assert!(Args::try_parse_from(["marvin42-controller", "--loop-hz", "2000"]).is_err());
        assert!(Args::try_parse_from(["marvin42-controller", "--loop-hz", "0"]).is_err());
    }
}
