//! `instrumentkit-paramgr`: a thin console client for the parameter manager
//! over the wire.
//!
//! Ensures a parameter-manager instance named `--name` exists on the server
//! at `--port`, then reads newline-delimited JSON commands from stdin and
//! replays each as the corresponding wire instruction, printing the decoded
//! response to stdout. This mirrors the companion console-script the
//! original system exposes for ad hoc parameter bookkeeping, without folding
//! that bookkeeping into the server process itself.
//!
//! Command shapes, one per stdin line:
//! ```json
//! {"add": {"path": "qubit.pi.length", "value": 40, "unit": "ns"}}
//! {"remove": {"path": "qubit.pi.length"}}
//! {"save": {"path": "/path/to/profile.json"}}
//! {"get": {"path": "qubit.pi.length"}}
//! ```

use std::io::{self, BufRead, Write};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use serde_json::Value;

use instrumentkit_cli::{main_with_exit_code, CliError};
use instrumentkit_core::paramgr::CLASS_PATH;
use instrumentkit_net::Client;
use instrumentkit_types::{Instruction, Operation, Response};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RETRIES: u32 = 3;

/// Drive a server's parameter manager from stdin commands.
#[derive(Parser, Debug)]
#[command(name = "instrumentkit-paramgr")]
struct Args {
    /// Instrument name of the parameter manager to find or create.
    #[arg(long, default_value = "parameter_manager")]
    name: String,

    /// Server host to connect to.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server primary port.
    #[arg(long, default_value_t = 5555)]
    port: u16,

    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Command {
    Add { path: String, value: Value, #[serde(default)] unit: String },
    Remove { path: String },
    Get { path: String },
    Save { path: String },
}

fn main() {
    main_with_exit_code(run)
}

fn run() -> Result<(), CliError> {
    let args = Args::parse();
    instrumentkit_cli::init_logging("instrumentkit-paramgr", args.verbose);

    let mut client = Client::connect((args.host.as_str(), args.port), DEFAULT_TIMEOUT, DEFAULT_RETRIES)
        .map_err(|e| CliError::Runtime(format!("connecting to {}:{}: {e}", args.host, args.port)))?;

    client
        .find_or_create_instrument(&args.name, CLASS_PATH)
        .map_err(|e| CliError::Runtime(format!("creating parameter manager `{}`: {e}", args.name)))?;
    log::info!("parameter manager `{}` ready on {}:{}", args.name, args.host, args.port);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| CliError::Runtime(e.to_string()))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let command: Command = match serde_json::from_str(line) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("malformed command, skipping: {e}");
                continue;
            }
        };

        let instruction = to_instruction(&args.name, command);
        let response = client.ask(instruction).map_err(|e| CliError::Runtime(e.to_string()))?;
        writeln!(stdout, "{}", render(&response)).ok();
    }
    Ok(())
}

fn to_instruction(target: &str, command: Command) -> Instruction {
    match command {
        Command::Add { path, value, unit } => {
            let mut instr = Instruction::new(Operation::AddParameter).with_target(target).with_value(value);
            instr.path = Some(path);
            instr.kwargs = Some([("unit".to_string(), serde_json::json!(unit))].into_iter().collect());
            instr
        }
        Command::Remove { path } => {
            let mut instr = Instruction::new(Operation::RemoveParameter).with_target(target);
            instr.path = Some(path);
            instr
        }
        Command::Get { path } => {
            let (parent, leaf) = split_leaf(&path);
            let mut instr = Instruction::new(Operation::Get).with_target(target).with_name(leaf);
            instr.path = parent;
            instr
        }
        Command::Save { path } => {
            let mut instr = Instruction::new(Operation::Save).with_target(target);
            instr.kwargs = Some([("path".to_string(), serde_json::json!(path))].into_iter().collect());
            instr
        }
    }
}

fn split_leaf(path: &str) -> (Option<String>, &str) {
    match path.rsplit_once('.') {
        Some((parent, leaf)) => (Some(parent.to_string()), leaf),
        None => (None, path),
    }
}

fn render(response: &Response) -> String {
    serde_json::to_string(response).unwrap_or_else(|_| "<unserializable response>".to_string())
}
