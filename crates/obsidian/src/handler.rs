//! Packet dispatch.
//!
//! [`PacketHandler`] is the seam between the read loop and whatever reacts
//! to decoded packets. The server's own handler drives the handshake,
//! status and login exchanges and answers keep-alives in Play; packets it
//! has no use for are logged and dropped.

use std::future::Future;
use std::sync::Arc;

use obsidian_mc::packets::{
    Handshake, LoginStart, LoginSuccess, Ping, Pong, ServerboundKeepAlive, StatusRequest,
    StatusResponse,
};
use obsidian_mc::{AnyPacket, ConnectionState, ProtocolVersion};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::connection::{Connection, Profile};
use crate::error::ConnectionError;
use crate::server::{SHUTDOWN_REASON, Shared};

/// What the read loop does after a packet has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading.
    Continue,
    /// The exchange is over; close the connection.
    Close,
}

/// Reacts to packets decoded by [`Connection::run`].
pub trait PacketHandler: Send + Sync {
    /// Handle one decoded serverbound packet.
    ///
    /// Errors that leave the stream intact disconnect the client with the
    /// error as the reason; the rest drop it.
    fn handle(
        &self,
        conn: &Arc<Connection>,
        packet: Box<dyn AnyPacket>,
    ) -> impl Future<Output = Result<Flow, ConnectionError>> + Send;
}

impl PacketHandler for Shared {
    async fn handle(
        &self,
        conn: &Arc<Connection>,
        packet: Box<dyn AnyPacket>,
    ) -> Result<Flow, ConnectionError> {
        let state = conn.state();
        match state {
            ConnectionState::Handshaking => {
                if let Some(handshake) = packet.downcast_ref::<Handshake>() {
                    return self.on_handshake(conn, handshake);
                }
            }
            ConnectionState::Status => {
                if packet.is::<StatusRequest>() {
                    let response = StatusResponse::new(self.status_json(conn.version()));
                    conn.send(&response).await?;
                    return Ok(Flow::Continue);
                }
                if let Some(ping) = packet.downcast_ref::<Ping>() {
                    conn.send(&Pong::new(ping.payload)).await?;
                    return Ok(Flow::Close);
                }
            }
            ConnectionState::Login => {
                if let Some(start) = packet.downcast_ref::<LoginStart>() {
                    return self.on_login_start(conn, start).await;
                }
            }
            ConnectionState::Play => {
                if let Some(keep_alive) = packet.downcast_ref::<ServerboundKeepAlive>() {
                    conn.acknowledge_keep_alive(keep_alive.id);
                    return Ok(Flow::Continue);
                }
            }
        }

        debug!(kind = %packet.kind(), %state, "No handler, ignoring");
        Ok(Flow::Continue)
    }
}

impl Shared {
    fn on_handshake(
        &self,
        conn: &Connection,
        handshake: &Handshake,
    ) -> Result<Flow, ConnectionError> {
        let declared = handshake.protocol_version;

        debug!(
            protocol = %declared,
            address = %handshake.server_address,
            port = handshake.server_port,
            next_state = ?handshake.next_state,
            "Received handshake"
        );

        if self.registry.supports(declared) {
            conn.set_version(declared);
        } else {
            debug!(protocol = %declared, "Unsupported version, staying on baseline table");
        }

        conn.transition(handshake.next_state.state())?;
        Ok(Flow::Continue)
    }

    async fn on_login_start(
        &self,
        conn: &Arc<Connection>,
        start: &LoginStart,
    ) -> Result<Flow, ConnectionError> {
        if conn.version().is_unknown() {
            debug!(username = %start.name, "Refusing login from unsupported version");
            conn.disconnect(&self.unsupported_version_reason()).await;
            return Ok(Flow::Close);
        }
        if !self.is_running() {
            conn.disconnect(SHUTDOWN_REASON).await;
            return Ok(Flow::Close);
        }

        let profile = Profile {
            uuid: Uuid::new_v4(),
            username: start.name.clone(),
        };
        conn.send(&LoginSuccess::new(profile.uuid, profile.username.as_str()))
            .await?;
        conn.transition(ConnectionState::Play)?;

        let uuid = profile.uuid;
        let username = profile.username.clone();
        conn.set_profile(profile);
        self.sessions.insert(uuid, Arc::clone(conn));

        // A stop that began after the check above has already kicked everyone
        if !self.is_running() {
            self.sessions.remove(&uuid);
            conn.disconnect(SHUTDOWN_REASON).await;
            return Ok(Flow::Close);
        }

        conn.start_keep_alive(self.config.keep_alive_interval);
        info!(player = %username, %uuid, version = %conn.version(), "Joined");
        Ok(Flow::Continue)
    }

    /// Status document for a client on `version`.
    ///
    /// Clients on versions without a table are shown the newest supported
    /// version, so the server list marks them as incompatible.
    pub(crate) fn status_json(&self, version: ProtocolVersion) -> String {
        let shown = if version.is_unknown() {
            self.registry.versions().last().copied().unwrap_or(version)
        } else {
            version
        };
        let online = if self.config.online_count_in_status {
            self.sessions.len()
        } else {
            0
        };

        json!({
            "version": {
                "name": shown.name().unwrap_or("unknown"),
                "protocol": shown.as_raw()
            },
            "players": {
                "max": self.config.max_players,
                "online": online,
                "sample": []
            },
            "description": {
                "text": self.config.motd
            }
        })
        .to_string()
    }

    fn unsupported_version_reason(&self) -> String {
        let names: Vec<_> = self
            .registry
            .versions()
            .into_iter()
            .filter_map(ProtocolVersion::name)
            .collect();
        format!("Unsupported client version, please use {}", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use obsidian_mc::default_registry;
    use serde_json::Value;

    fn shared(config: ServerConfig) -> Shared {
        Shared::new(config, Arc::new(default_registry().unwrap()))
    }

    #[test]
    fn test_status_json_for_supported_version() {
        let shared = shared(ServerConfig::default().with_motd("Hi").with_max_players(8));
        let status: Value =
            serde_json::from_str(&shared.status_json(ProtocolVersion::V1_16_2)).unwrap();

        assert_eq!(status["version"]["protocol"], 751);
        assert_eq!(status["version"]["name"], "1.16.2");
        assert_eq!(status["players"]["max"], 8);
        assert_eq!(status["players"]["online"], 0);
        assert_eq!(status["description"]["text"], "Hi");
    }

    #[test]
    fn test_status_json_for_unsupported_version() {
        let shared = shared(ServerConfig::default());
        let status: Value =
            serde_json::from_str(&shared.status_json(ProtocolVersion::UNKNOWN)).unwrap();

        assert_eq!(status["version"]["protocol"], 754);
        assert_eq!(status["version"]["name"], "1.16.5");
    }

    #[test]
    fn test_unsupported_version_reason_lists_versions() {
        let reason = shared(ServerConfig::default()).unsupported_version_reason();
        assert_eq!(
            reason,
            "Unsupported client version, please use 1.16, 1.16.1, 1.16.2, 1.16.3, 1.16.5"
        );
    }
}
