use anyhow::{Context, Result, bail};
use chorus::Role;
use chorus::server::config::DEFAULT_LISTEN;
use chorus::server::sfu::DEFAULT_STUN_SERVER;
use chorus::server::{MemoryStorage, ServerConfig, SqliteStorage, Storage, TransportConfig};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Group chat server with an audio call relay.
#[derive(Debug, Parser)]
#[command(name = "chorus", version)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "CHORUS_LISTEN", default_value = DEFAULT_LISTEN)]
    listen: SocketAddr,

    /// SQLite URL, e.g. `sqlite://chorus.db`. In-memory storage when unset.
    #[arg(long, env = "CHORUS_DATABASE_URL")]
    database_url: Option<String>,

    /// Comma-separated ICE server URLs.
    #[arg(
        long,
        env = "CHORUS_ICE_SERVERS",
        value_delimiter = ',',
        default_value = DEFAULT_STUN_SERVER
    )]
    ice_servers: Vec<String>,

    /// `user:password` of an account to create or promote to admin on start.
    #[arg(long, env = "CHORUS_BOOTSTRAP_ADMIN")]
    bootstrap_admin: Option<String>,

    /// Seconds to wait for an answer to a server offer; 0 disables.
    #[arg(long, env = "CHORUS_NEGOTIATION_TIMEOUT", default_value_t = 30)]
    negotiation_timeout: u64,

    /// Per-connection outbound queue capacity.
    #[arg(long, env = "CHORUS_OUTBOUND_QUEUE", default_value_t = 256)]
    outbound_queue: usize,

    /// Log filter, overrides RUST_LOG.
    #[arg(long)]
    log: Option<String>,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            listen: self.listen,
            outbound_queue: self.outbound_queue.max(1),
            transport: TransportConfig {
                ice_servers: self
                    .ice_servers
                    .iter()
                    .map(|s| s.trim().to_owned())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            negotiation_timeout: Duration::from_secs(self.negotiation_timeout),
        }
    }
}

fn init_tracing(directive: Option<&str>) {
    let filter = match directive {
        Some(d) => EnvFilter::new(d),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn open_storage(url: Option<&str>) -> Result<Arc<dyn Storage>> {
    match url {
        Some(url) => {
            let storage = SqliteStorage::connect(url)
                .await
                .with_context(|| format!("Failed to open storage at {url}"))?;
            Ok(Arc::new(storage))
        }
        None => {
            warn!("No database configured, users and history are kept in memory");
            Ok(Arc::new(MemoryStorage::new()))
        }
    }
}

async fn bootstrap_admin(storage: &dyn Storage, account: &str) -> Result<()> {
    let Some((username, password)) = account.split_once(':') else {
        bail!("bootstrap admin must look like user:password");
    };
    if username.is_empty() || password.is_empty() {
        bail!("bootstrap admin needs both a username and a password");
    }

    storage
        .ensure_user(username, password, Role::Admin)
        .await
        .context("Failed to create bootstrap admin")?;
    info!("Bootstrap admin {} is ready", username);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log.as_deref());

    info!("Initializing chat server...");

    let storage = open_storage(args.database_url.as_deref()).await?;
    if let Some(account) = args.bootstrap_admin.as_deref() {
        bootstrap_admin(storage.as_ref(), account).await?;
    }

    chorus::server::serve(args.server_config(), storage).await
}
