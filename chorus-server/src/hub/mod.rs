mod connection_entry;
mod hub;
mod hub_command;
mod hub_handle;
pub mod presence;

pub use connection_entry::{ConnectionEntry, DEFAULT_OUTBOUND_QUEUE};
pub use hub::Hub;
pub use hub_handle::{HubError, HubHandle};
