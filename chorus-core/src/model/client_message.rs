use crate::model::payload::{
    ChatPayload, HistoryRequest, IceCandidatePayload, PromoteUserPayload, SdpPayload,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame is not a valid envelope: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),

    #[error("unknown message type '{0}'")]
    UnknownType(String),

    #[error("malformed payload for '{kind}': {source}")]
    MalformedPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

/// Сообщения, приходящие от клиента по WebSocket.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Chat(ChatPayload),
    JoinCall,
    SdpOffer(SdpPayload),
    SdpAnswer(SdpPayload),
    IceCandidate(IceCandidatePayload),
    PromoteUser(PromoteUserPayload),
    ListChatMembers,
    ListCallMembers,
    History(HistoryRequest),
}

impl ClientMessage {
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let envelope: Envelope =
            serde_json::from_slice(frame).map_err(ProtocolError::InvalidEnvelope)?;
        let Envelope { kind, payload } = envelope;

        let message = match kind.as_str() {
            "chat_message" => ClientMessage::Chat(parse(&kind, payload)?),
            "join_call" => ClientMessage::JoinCall,
            "sdp_offer" => ClientMessage::SdpOffer(parse(&kind, payload)?),
            "sdp_answer" => ClientMessage::SdpAnswer(parse(&kind, payload)?),
            "ice_candidate" => ClientMessage::IceCandidate(parse(&kind, payload)?),
            "promote_user" => ClientMessage::PromoteUser(parse(&kind, payload)?),
            "get_active_clients_ws" => ClientMessage::ListChatMembers,
            "get_active_clients_sfu" => ClientMessage::ListCallMembers,
            // An unreadable limit falls back to the default instead of dropping the request.
            "get_messages_request" => {
                ClientMessage::History(serde_json::from_value(payload).unwrap_or_default())
            }
            _ => return Err(ProtocolError::UnknownType(kind)),
        };

        Ok(message)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Chat(_) => "chat_message",
            ClientMessage::JoinCall => "join_call",
            ClientMessage::SdpOffer(_) => "sdp_offer",
            ClientMessage::SdpAnswer(_) => "sdp_answer",
            ClientMessage::IceCandidate(_) => "ice_candidate",
            ClientMessage::PromoteUser(_) => "promote_user",
            ClientMessage::ListChatMembers => "get_active_clients_ws",
            ClientMessage::ListCallMembers => "get_active_clients_sfu",
            ClientMessage::History(_) => "get_messages_request",
        }
    }
}

fn parse<T: DeserializeOwned>(kind: &str, payload: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(payload).map_err(|source| ProtocolError::MalformedPayload {
        kind: kind.to_owned(),
        source,
    })
}
