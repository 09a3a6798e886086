use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use rendezvous_core::IceServerConfig;
use rendezvous_server::{MemoryRoomStore, RelayConfig, RelayService, SessionConfig, serve};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rendezvous")]
#[command(about = "WebRTC signaling relay")]
struct Cli {
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the WebSocket relay backed by an in-memory room store.
    Serve {
        #[arg(long, env = "RENDEZVOUS_ADDR", default_value = "0.0.0.0:3000")]
        addr: SocketAddr,

        #[arg(
            long = "ice-server",
            env = "RENDEZVOUS_ICE_SERVERS",
            value_delimiter = ',',
            default_value = "stun:stun.l.google.com:19302"
        )]
        ice_servers: Vec<String>,

        #[arg(long, env = "TURN_USERNAME")]
        turn_username: Option<String>,

        #[arg(long, env = "TURN_CREDENTIAL")]
        turn_credential: Option<String>,

        #[arg(long, default_value_t = 10_000)]
        op_timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Commands::Serve {
            addr,
            ice_servers,
            turn_username,
            turn_credential,
            op_timeout_ms,
        } => {
            let config = RelayConfig {
                ice_servers: vec![IceServerConfig {
                    urls: ice_servers,
                    username: turn_username,
                    credential: turn_credential,
                }],
                session: SessionConfig {
                    op_timeout: Duration::from_millis(op_timeout_ms),
                    ..SessionConfig::default()
                },
            };

            println!("{}", "Starting rendezvous relay...".green().bold());
            println!("   ws:      ws://{}/ws/<peer_id>", addr);
            println!("   status:  http://{}/rooms/<room_id>/active", addr);
            info!("ICE servers: {:?}", config.ice_servers);

            let service = RelayService::new(Arc::new(MemoryRoomStore::new()), config);
            serve(addr, service).await?;
        }
    }

    Ok(())
}

fn init_tracing(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("Invalid log level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}
