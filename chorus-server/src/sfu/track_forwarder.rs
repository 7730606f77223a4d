use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use webrtc::rtp::packet::Packet;
use webrtc::track::track_local::TrackLocalWriter;
use webrtc::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use webrtc::track::track_remote::TrackRemote;
use webrtc::{interceptor, srtp, util};

#[derive(Debug, Error)]
pub enum ReadError {
    /// Пакет не удалось разобрать, но поток жив.
    #[error("malformed RTP packet: {0}")]
    Malformed(String),

    #[error("source track ended: {0}")]
    Ended(String),
}

impl From<webrtc::Error> for ReadError {
    fn from(e: webrtc::Error) -> Self {
        if is_decode_error(&e) {
            ReadError::Malformed(e.to_string())
        } else {
            ReadError::Ended(e.to_string())
        }
    }
}

/// RTP decode failures surface either directly or wrapped by the SRTP
/// stream and the interceptor chain.
fn is_decode_error(e: &webrtc::Error) -> bool {
    match e {
        webrtc::Error::Rtp(_) => true,
        webrtc::Error::Util(e) => wraps_rtp_error(e),
        webrtc::Error::Interceptor(interceptor::Error::Rtp(_)) => true,
        webrtc::Error::Interceptor(interceptor::Error::Util(e)) => wraps_rtp_error(e),
        webrtc::Error::Interceptor(interceptor::Error::Srtp(srtp::Error::Util(e))) => {
            wraps_rtp_error(e)
        }
        _ => false,
    }
}

fn wraps_rtp_error(e: &util::Error) -> bool {
    e.downcast_ref::<webrtc::rtp::Error>().is_some()
}

/// Откуда пересылатель читает RTP-пакеты (входящий трек участника).
#[async_trait]
pub trait RtpSource: Send + Sync {
    async fn read_packet(&self) -> Result<Packet, ReadError>;
}

/// Куда пересылатель пишет RTP-пакеты (локальный трек сервера).
#[async_trait]
pub trait RtpSink: Send + Sync {
    async fn write_packet(&self, packet: &Packet) -> Result<()>;
}

#[async_trait]
impl RtpSource for TrackRemote {
    async fn read_packet(&self) -> Result<Packet, ReadError> {
        let (packet, _attributes) = self.read_rtp().await?;
        Ok(packet)
    }
}

#[async_trait]
impl RtpSink for TrackLocalStaticRTP {
    async fn write_packet(&self, packet: &Packet) -> Result<()> {
        self.write_rtp(packet).await?;
        Ok(())
    }
}

/// Header extensions are negotiated per peer connection, so ids from the
/// publisher's session mean nothing to subscribers.
pub fn strip_header_extensions(packet: &mut Packet) {
    packet.header.extension = false;
    packet.header.extension_profile = 0;
    packet.header.extensions.clear();
}

/// Copies packets from `source` into `sink` until the source ends, the sink
/// fails, or `cancel` fires. Packets that fail to decode are skipped.
/// Returns the number of forwarded packets.
pub async fn forward_rtp(
    source: &dyn RtpSource,
    sink: &dyn RtpSink,
    cancel: &CancellationToken,
    track_id: &str,
) -> u64 {
    let mut forwarded = 0u64;

    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(track_id, forwarded, "Forwarding cancelled");
                break;
            }
            read = source.read_packet() => read,
        };

        let mut packet = match read {
            Ok(packet) => packet,
            Err(ReadError::Malformed(e)) => {
                debug!(track_id, "Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e @ ReadError::Ended(_)) => {
                debug!(track_id, forwarded, "{}", e);
                break;
            }
        };

        strip_header_extensions(&mut packet);

        if let Err(e) = sink.write_packet(&packet).await {
            debug!(track_id, forwarded, "Local track write failed: {}", e);
            break;
        }

        forwarded += 1;
        trace!(track_id, seq = packet.header.sequence_number, "Forwarded RTP packet");
    }

    forwarded
}
