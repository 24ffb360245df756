mod cli;
mod error;
mod link;
mod protocol;
mod server;

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use odin_config::{Config, load_authorization_file, load_config, render_config};
use odin_core::Master;

use crate::cli::{Cli, Command, LogFormat, RunArgs};
use crate::error::MasterError;
use crate::link::TcpAgentConnector;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose, cli.global.log_format);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, format: LogFormat) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> Result<(), MasterError> {
    let config_file = cli.global.config.clone().unwrap_or_else(odin_config::config_path);
    let cfg = load_config(Some(&config_file)).map_err(|source| MasterError::Config {
        path: config_file.display().to_string(),
        source,
    })?;

    match cli.command {
        Command::Run(args) => run_master(cfg, args, &config_file).await,
        Command::ShowConfig => {
            let rendered = render_config(&cfg).map_err(|source| MasterError::Config {
                path: config_file.display().to_string(),
                source,
            })?;
            print!("{rendered}");
            Ok(())
        }
        Command::CheckAuth { path } => {
            let path = path.unwrap_or(cfg.master.auth_file);
            let clients = load_authorization_file(&path)
                .map_err(|source| MasterError::Authorization { source })?;
            for c in &clients {
                println!("{} {} {} {}", c.mac, c.ip, c.bssid, c.ssid);
            }
            eprintln!("{} client(s) in {}", clients.len(), path.display());
            Ok(())
        }
    }
}

async fn run_master(mut cfg: Config, args: RunArgs, config_file: &Path) -> Result<(), MasterError> {
    if let Some(listen) = args.listen {
        cfg.master.listen = listen;
    }
    if let Some(port) = args.control_port {
        cfg.master.control_port = port;
    }
    if let Some(auth_file) = args.auth_file {
        cfg.master.auth_file = auth_file;
    }

    let master_config = cfg.to_master_config().map_err(|source| MasterError::Config {
        path: config_file.display().to_string(),
        source,
    })?;

    let cancel = CancellationToken::new();
    let tracker = TaskTracker::new();
    let (lost_tx, lost_rx) = mpsc::unbounded_channel();
    let connector = TcpAgentConnector::new(
        cfg.master.control_port,
        lost_tx,
        cancel.clone(),
        tracker.clone(),
    );
    let master = Master::new(master_config, std::sync::Arc::new(connector));

    let authorized = load_authorization_file(&cfg.master.auth_file)
        .map_err(|source| MasterError::Authorization { source })?;
    let loaded = master.load_authorized_clients(authorized);
    info!(count = loaded, file = %cfg.master.auth_file.display(), "authorized clients loaded");

    if !args.no_mobility {
        master.start_application(master.mobility_manager());
    }

    let socket = UdpSocket::bind(cfg.master.listen)
        .await
        .map_err(|source| MasterError::Bind {
            addr: cfg.master.listen,
            source,
        })?;

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        info!("shutdown requested");
        shutdown.cancel();
    });

    let result = server::serve(
        master.clone(),
        socket,
        Duration::from_secs(cfg.master.reap_interval_secs),
        lost_rx,
        cancel.clone(),
    )
    .await;

    cancel.cancel();
    master.quiesce().await;
    tracker.close();
    tracker.wait().await;
    result
}
