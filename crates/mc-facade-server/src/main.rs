mod config;
mod connection;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use config::ServerConfig;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{info, warn};

const CONFIG_PATH: &str = "server.toml";

#[tokio::main]
async fn main() {
    if !Path::new(CONFIG_PATH).exists() {
        if let Err(e) = ServerConfig::write_default(CONFIG_PATH) {
            eprintln!("Failed to write default {CONFIG_PATH}: {e}");
            std::process::exit(1);
        }
        println!("{CONFIG_PATH} not found! Generated a default config. Edit it and run again.");
        return;
    }

    let config = Arc::new(match ServerConfig::load(CONFIG_PATH) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load {CONFIG_PATH}: {e}");
            std::process::exit(1);
        }
    });

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        "mc-facade v{} starting on {}:{}",
        env!("CARGO_PKG_VERSION"),
        config.server.address,
        config.server.port
    );
    info!("Version text: {}", config.server.version_text);
    info!(
        "Players: {}/{} (static)",
        config.server.online_players, config.server.max_players
    );
    if config.icon_bytes.is_some() {
        info!("Server icon: {}", config.server.icon);
    }

    let addr: SocketAddr = format!("{}:{}", config.server.address, config.server.port)
        .parse()
        .expect("invalid bind address");

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Cannot bind to {addr}: {e}");
            std::process::exit(1);
        }
    };
    info!("Listening on {addr}");

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let mut tasks = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let _ = stream.set_nodelay(true);
                        tasks.spawn(connection::handle_connection(
                            stream,
                            peer,
                            config.clone(),
                        ));
                    }
                    Err(e) => warn!("Accept error: {e}"),
                }
            }
            // Reap finished handlers so the set stays bounded.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    let grace = config.limits.shutdown_grace();
    if !tasks.is_empty() {
        info!(
            "Waiting up to {}s for {} in-flight connection(s)",
            grace.as_secs(),
            tasks.len()
        );
        let drain = async {
            while tasks.join_next().await.is_some() {}
        };
        if tokio::time::timeout(grace, drain).await.is_err() {
            warn!("Grace period elapsed, aborting remaining connections");
        }
    }
    info!("Server shut down.");
}
