//! `instrumentkit-server`: the router/publisher process.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use instrumentkit_cli::{main_with_exit_code, CliError};
use instrumentkit_core::config::StartupConfig;
use instrumentkit_core::paramgr::{ParameterManager, DEFAULT_NAME as PARAMGR_NAME};
use instrumentkit_core::{init_script, BroadcastBus, Dispatcher, Registry, WorkerPool};
use instrumentkit_net::{Publisher, Router};

/// Serve instrumentkit instruments to network clients.
#[derive(Parser, Debug)]
#[command(name = "instrumentkit-server")]
struct Args {
    /// Primary request/reply port.
    #[arg(short = 'p', long, default_value_t = 5555)]
    port: u16,

    /// Broadcast port; defaults to the primary port + 1. This flag, or
    /// `networking.broadcastPort` in `--config`, is the only way to
    /// override it — never derived silently.
    #[arg(long)]
    broadcast_port: Option<u16>,

    /// Additional bind address for multi-interface listening. Repeatable.
    #[arg(short = 'a', long = "listen_at")]
    listen_at: Vec<String>,

    /// Startup config YAML naming pre-loaded instruments and networking overrides.
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Newline-delimited JSON instruction file replayed once at startup.
    #[arg(short = 'i', long = "init_script")]
    init_script: Option<PathBuf>,

    /// Worker pool size.
    #[arg(long, default_value_t = instrumentkit_core::pool::DEFAULT_WORKERS)]
    workers: usize,

    /// Accepted for compatibility with the original console-script surface;
    /// this server has no built-in GUI to enable — GUIs are external
    /// collaborators, not a responsibility of this process.
    #[arg(long, default_value_t = false)]
    gui: bool,

    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() {
    main_with_exit_code(run)
}

fn run() -> Result<(), CliError> {
    let args = Args::parse();
    instrumentkit_cli::init_logging("instrumentkit-server", args.verbose);
    if args.gui {
        log::warn!("--gui was requested but this server has no built-in GUI; ignoring");
    }

    let registry = Arc::new(Registry::with_builtins());
    registry.register(PARAMGR_NAME, Arc::new(ParameterManager::new()));

    let mut broadcast_port = args.port.checked_add(1);
    if let Some(config_path) = &args.config {
        let config = StartupConfig::load(config_path).map_err(|e| CliError::Config(e.to_string()))?;
        config.apply(&registry).map_err(|e| CliError::Config(e.to_string()))?;
        if let Some(net) = &config.networking {
            if let Some(port) = net.broadcast_port {
                broadcast_port = Some(port);
            }
        }
        if let Some(pm) = &config.parameter_manager {
            if let Some(profile) = &pm.profile {
                let mgr = registry
                    .get(PARAMGR_NAME)
                    .expect("parameter manager registered above");
                let mgr = mgr
                    .as_any()
                    .downcast_ref::<ParameterManager>()
                    .expect("registered as ParameterManager");
                mgr.load_profile(profile).map_err(|e| CliError::Config(format!("loading parameter-manager profile: {e}")))?;
            }
        }
    }
    if let Some(port) = args.broadcast_port {
        broadcast_port = Some(port);
    }
    let broadcast_port = broadcast_port.ok_or_else(|| CliError::Config("broadcast port overflowed u16".to_string()))?;

    let bus = Arc::new(BroadcastBus::new());
    let dispatcher = Arc::new(Dispatcher::new(registry.clone(), bus.clone()));

    if let Some(init_script_path) = &args.init_script {
        init_script::run(init_script_path, &dispatcher).map_err(|e| CliError::Config(e.to_string()))?;
    }

    let pool = Arc::new(WorkerPool::new(args.workers, dispatcher));

    let publisher = Publisher::bind(("0.0.0.0", broadcast_port)).map_err(CliError::Bind)?;
    bus.register(Arc::new(publisher.sink()));
    log::info!("broadcast publisher listening on 0.0.0.0:{broadcast_port}");
    std::thread::spawn(move || {
        if let Err(e) = publisher.serve() {
            log::error!("publisher accept loop exited: {e}");
        }
    });

    let primary_addr: SocketAddr = (std::net::Ipv4Addr::UNSPECIFIED, args.port).into();
    let router = Router::bind(primary_addr).map_err(CliError::Bind)?;
    log::info!("router listening on {primary_addr}");

    for extra in &args.listen_at {
        let extra = extra.clone();
        let pool = pool.clone();
        let router = Router::bind(extra.as_str()).map_err(CliError::Bind)?;
        log::info!("router also listening on {extra}");
        std::thread::spawn(move || {
            if let Err(e) = router.serve(pool) {
                log::error!("extra router accept loop exited: {e}");
            }
        });
    }

    router.serve(pool).map_err(|e| CliError::Runtime(e.to_string()))
}
