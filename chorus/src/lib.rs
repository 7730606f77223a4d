pub use chorus_core::{ConnectionId, Role};

pub mod model {
    pub use chorus_core::model::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use chorus_server::*;
}
