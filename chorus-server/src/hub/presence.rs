use crate::hub::ConnectionEntry;
use crate::sfu::{SfuEvent, SfuEventKind};
use chorus_core::{CallMember, ServerMessage};

pub fn welcome(entry: &ConnectionEntry) -> ServerMessage {
    ServerMessage::SystemMessage {
        message: format!(
            "Welcome, {}! You are connected as {}.",
            entry.username, entry.role
        ),
    }
}

pub fn member_joined(entry: &ConnectionEntry) -> ServerMessage {
    ServerMessage::UserJoinWs(entry.info())
}

pub fn member_left(entry: &ConnectionEntry) -> ServerMessage {
    ServerMessage::UserLeaveWs(entry.info())
}

pub fn call_event(event: &SfuEvent) -> ServerMessage {
    let member = CallMember {
        username: event.username.clone(),
    };

    match event.kind {
        SfuEventKind::JoinedCall => ServerMessage::UserJoinSfu(member),
        SfuEventKind::LeftCall => ServerMessage::UserLeaveSfu(member),
    }
}
