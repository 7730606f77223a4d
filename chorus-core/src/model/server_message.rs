use crate::model::payload::{
    CallMember, ChatEntry, IceCandidatePayload, MemberInfo, RoleChange, SessionDescription,
};
use bytes::Bytes;
use serde::Serialize;

/// Сообщения, отправляемые клиенту по WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    ChatMessage(ChatEntry),
    SystemMessage { message: String },
    SystemError { error: String },
    UserJoinWs(MemberInfo),
    UserLeaveWs(MemberInfo),
    UserJoinSfu(CallMember),
    UserLeaveSfu(CallMember),
    JoinCallSuccess,
    SdpOffer(SessionDescription),
    SdpAnswer(SessionDescription),
    IceCandidate(IceCandidatePayload),
    PromoteUserResponse(RoleChange),
    ActiveClientsWsResponse(Vec<MemberInfo>),
    ActiveClientsSfuResponse(Vec<CallMember>),
    GetMessagesResponse(Vec<ChatEntry>),
}

impl ServerMessage {
    pub fn system_error(error: impl Into<String>) -> Self {
        ServerMessage::SystemError {
            error: error.into(),
        }
    }

    pub fn encode(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}
