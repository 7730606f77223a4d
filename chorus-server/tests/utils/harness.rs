use chorus_server::{AppState, MemoryStorage, ServerConfig, Storage, TransportConfig, serve_on};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// A server bound to an ephemeral localhost port. Stops when dropped.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub storage: Arc<MemoryStorage>,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    pub fn ws_url(&self, username: &str, password: &str) -> String {
        format!(
            "ws://{}/ws?username={}&password={}",
            self.addr, username, password
        )
    }
}

pub fn local_transport() -> TransportConfig {
    TransportConfig {
        ice_servers: Vec::new(),
    }
}

pub async fn spawn_server() -> TestServer {
    spawn_server_with(|_| {}).await
}

pub async fn spawn_server_with(tweak: impl FnOnce(&mut ServerConfig)) -> TestServer {
    let mut config = ServerConfig {
        transport: local_transport(),
        negotiation_timeout: Duration::ZERO,
        ..Default::default()
    };
    tweak(&mut config);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");

    let storage = Arc::new(MemoryStorage::new());
    let state = AppState::new(config, storage.clone() as Arc<dyn Storage>).expect("app state");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server_state = state.clone();
    tokio::spawn(async move {
        let shutdown = async move {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = serve_on(listener, server_state, shutdown).await {
            tracing::error!("Test server failed: {:?}", e);
        }
    });

    TestServer {
        addr,
        state,
        storage,
        _shutdown: shutdown_tx,
    }
}
