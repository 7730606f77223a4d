mod client_message;
mod connection_id;
mod payload;
mod role;
mod server_message;

pub use client_message::{ClientMessage, ProtocolError};
pub use connection_id::ConnectionId;
pub use payload::{
    CallMember, ChatEntry, ChatPayload, HistoryRequest, IceCandidatePayload, MemberInfo,
    PromoteUserPayload, RoleChange, SdpPayload, SessionDescription,
};
pub use role::{Role, UnknownRole};
pub use server_message::ServerMessage;
