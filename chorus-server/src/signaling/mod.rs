mod connection_sink;
mod signaling_sink;
mod ws_handler;

pub use connection_sink::ConnectionSink;
pub use signaling_sink::SignalingSink;
pub(crate) use signaling_sink::send_message;
pub use ws_handler::{Credentials, ws_handler};
