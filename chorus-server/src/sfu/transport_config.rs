use anyhow::Result;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{API, APIBuilder};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;

pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Конфигурация WebRTC для всех медиа-соединений сервера.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![DEFAULT_STUN_SERVER.to_owned()],
        }
    }
}

impl TransportConfig {
    /// Общий API-объект: кодеки по умолчанию и стандартные интерцепторы (RTCP отчёты, NACK).
    pub fn build_api(&self) -> Result<API> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        Ok(APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build())
    }

    pub fn rtc_configuration(&self) -> RTCConfiguration {
        let ice_servers = if self.ice_servers.is_empty() {
            Vec::new()
        } else {
            vec![RTCIceServer {
                urls: self.ice_servers.clone(),
                credential: String::new(),
                username: String::new(),
            }]
        };

        RTCConfiguration {
            ice_servers,
            ..Default::default()
        }
    }
}
