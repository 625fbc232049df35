//! `instrumentkit-listener`: a standalone subscriber process that prints
//! every broadcast event matching a topic prefix.

use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

use instrumentkit_cli::{main_with_exit_code, CliError};
use instrumentkit_net::SubscriberHandle;

/// Subscribe to parameter-change broadcasts and print them as they arrive.
#[derive(Parser, Debug)]
#[command(name = "instrumentkit-listener")]
struct Args {
    /// Subscriber config YAML naming host/port/topic; overridden by the
    /// individual flags below when both are given.
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Topic prefix filter; empty subscribes to every instrument.
    #[arg(long)]
    topic: Option<String>,

    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ListenerConfig {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    topic: Option<String>,
}

impl ListenerConfig {
    fn load(path: &std::path::Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|e| CliError::Config(format!("reading {}: {e}", path.display())))?;
        serde_yaml::from_str(&text).map_err(|e| CliError::Config(format!("parsing {}: {e}", path.display())))
    }
}

fn main() {
    main_with_exit_code(run)
}

fn run() -> Result<(), CliError> {
    let args = Args::parse();
    instrumentkit_cli::init_logging("instrumentkit-listener", args.verbose);

    let from_config = match &args.config {
        Some(path) => ListenerConfig::load(path)?,
        None => ListenerConfig::default(),
    };

    let host = args.host.or(from_config.host).unwrap_or_else(|| "127.0.0.1".to_string());
    let port = args.port.or(from_config.port).ok_or_else(|| CliError::Config("no broadcast port given (use --port or --config)".to_string()))?;
    let topic = args.topic.or(from_config.topic).unwrap_or_default();

    log::info!("subscribing to {host}:{port} with topic prefix {topic:?}");
    let subscriber = SubscriberHandle::start(
        (host.as_str(), port),
        topic.clone(),
        move |topic, body| {
            let line = serde_json::json!({ "topic": topic, "value": body.value, "unit": body.unit, "ts": body.ts });
            println!("{line}");
        },
    )
    .map_err(CliError::Bind)?;

    // The subscriber runs on its own thread; block the main thread until the
    // process is killed, then let `stop` join it within its grace period.
    let (_tx, rx) = std::sync::mpsc::channel::<()>();
    let _ = rx.recv();
    subscriber.stop();
    Ok(())
}
