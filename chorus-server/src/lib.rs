pub mod app;
pub mod config;
pub mod handlers;
pub mod hub;
pub mod sfu;
pub mod signaling;
pub mod storage;

pub use app::{AppState, router, serve, serve_on};
pub use config::ServerConfig;
pub use hub::{ConnectionEntry, Hub, HubError, HubHandle};
pub use sfu::{MediaManager, TransportConfig};
pub use signaling::{ConnectionSink, SignalingSink, ws_handler};
pub use storage::{MemoryStorage, SqliteStorage, Storage, StorageError};
