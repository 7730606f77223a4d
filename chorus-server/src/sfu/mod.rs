mod media_manager;
mod media_peer;
mod sfu_event;
mod track_forwarder;
mod transport_config;

pub use media_manager::{DEFAULT_NEGOTIATION_TIMEOUT, MediaManager};
pub use media_peer::MediaPeer;
pub use sfu_event::{EVENT_BUS_CAPACITY, EventPublisher, SfuEvent, SfuEventKind, event_bus};
pub use track_forwarder::{ReadError, RtpSink, RtpSource, forward_rtp, strip_header_extensions};
pub use transport_config::{DEFAULT_STUN_SERVER, TransportConfig};
