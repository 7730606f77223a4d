use tokio::sync::mpsc;
use tracing::warn;

pub const EVENT_BUS_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SfuEventKind {
    JoinedCall,
    LeftCall,
}

/// Событие жизненного цикла звонка, которое медиа-менеджер передаёт хабу.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SfuEvent {
    pub username: String,
    pub kind: SfuEventKind,
}

pub fn event_bus() -> (EventPublisher, mpsc::Receiver<SfuEvent>) {
    let (tx, rx) = mpsc::channel(EVENT_BUS_CAPACITY);
    (EventPublisher { tx }, rx)
}

/// Producer side of the event bus. Publishing never waits: when the hub lags
/// behind, the event is dropped.
#[derive(Clone)]
pub struct EventPublisher {
    tx: mpsc::Sender<SfuEvent>,
}

impl EventPublisher {
    pub fn publish(&self, username: &str, kind: SfuEventKind) {
        let event = SfuEvent {
            username: username.to_owned(),
            kind,
        };

        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!("Event bus is full, dropping {:?}", event);
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!("Event bus is closed, dropping {:?}", event);
            }
        }
    }
}
