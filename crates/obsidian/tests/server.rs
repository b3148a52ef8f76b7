//! Integration tests for the Obsidian server over real TCP connections.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use obsidian::{SHUTDOWN_REASON, Server, ServerConfig, ServerError};
use obsidian_mc::codec::{read_frame, write_frame};
use obsidian_mc::packets::{
    ClientboundKeepAlive, Handshake, LoginDisconnect, LoginStart, LoginSuccess, NextState, Ping,
    PlayDisconnect, PlayerPositionAndLook, Pong, ServerDifficulty, ServerboundKeepAlive,
    StatusRequest, StatusResponse,
};
use obsidian_mc::{Buffer, Packet, ProtocolVersion, RawPacket, default_registry};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time;
use uuid::Uuid;

// =========================================================================
// Helpers
// =========================================================================

const VERSION: ProtocolVersion = ProtocolVersion::V1_16_4;

fn server_with(config: ServerConfig) -> Server {
    let config = config.with_addr("127.0.0.1:0");
    Server::new(config, Arc::new(default_registry().unwrap()))
}

fn server() -> Server {
    server_with(ServerConfig::default())
}

/// Poll `check` until it holds, failing after a second.
async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..100 {
        if check() {
            return;
        }
        time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

/// Minimal protocol client speaking raw frames.
struct Client {
    stream: TcpStream,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.unwrap(),
        }
    }

    async fn send<P: Packet>(&mut self, id: i32, packet: &P) {
        let mut payload = Buffer::new();
        packet.encode(&mut payload, VERSION).unwrap();
        write_frame(&mut self.stream, &RawPacket::new(id, payload))
            .await
            .unwrap();
    }

    async fn send_raw(&mut self, id: i32, bytes: &[u8]) {
        let mut payload = Buffer::new();
        payload.write_bytes(bytes).unwrap();
        write_frame(&mut self.stream, &RawPacket::new(id, payload))
            .await
            .unwrap();
    }

    async fn recv(&mut self) -> RawPacket {
        time::timeout(Duration::from_secs(2), read_frame(&mut self.stream))
            .await
            .expect("timed out waiting for a frame")
            .unwrap()
            .expect("connection closed")
    }

    async fn recv_as<P: Packet>(&mut self, id: i32) -> P {
        let mut raw = self.recv().await;
        assert_eq!(raw.id, id, "expected {}", P::KIND);
        let packet = P::decode(&mut raw.payload, VERSION).unwrap();
        assert_eq!(raw.payload.remaining(), 0);
        packet
    }

    /// Whether the server closed the stream without sending more frames.
    async fn closed(&mut self) -> bool {
        match time::timeout(Duration::from_secs(2), read_frame(&mut self.stream)).await {
            Ok(Ok(None) | Err(_)) => true,
            Ok(Ok(Some(_))) | Err(_) => false,
        }
    }

    async fn handshake(&mut self, version: ProtocolVersion, next_state: NextState) {
        let handshake = Handshake {
            protocol_version: version,
            server_address: "localhost".to_string(),
            server_port: 25565,
            next_state,
        };
        self.send(0x00, &handshake).await;
    }

    async fn login(&mut self, name: &str) -> LoginSuccess {
        self.handshake(VERSION, NextState::Login).await;
        self.send(0x00, &LoginStart::new(name)).await;
        self.recv_as::<LoginSuccess>(0x02).await
    }
}

// =========================================================================
// Status
// =========================================================================

#[tokio::test]
async fn test_status_exchange() {
    let server = server_with(ServerConfig::default().with_motd("Integration").with_max_players(3));
    let addr = server.start().await.unwrap();

    let mut client = Client::connect(addr).await;
    client.handshake(VERSION, NextState::Status).await;
    client.send(0x00, &StatusRequest).await;

    let response = client.recv_as::<StatusResponse>(0x00).await;
    let status: Value = serde_json::from_str(&response.json).unwrap();
    assert_eq!(status["version"]["protocol"], 754);
    assert_eq!(status["players"]["max"], 3);
    assert_eq!(status["description"]["text"], "Integration");

    client.send(0x01, &Ping::new(1_700_000_000)).await;
    let pong = client.recv_as::<Pong>(0x01).await;
    assert_eq!(pong.payload, 1_700_000_000);

    assert!(client.closed().await);
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_unknown_packet_in_handshaking_is_skipped() {
    let server = server();
    let addr = server.start().await.unwrap();

    let mut client = Client::connect(addr).await;
    client.send_raw(0x42, &[0xDE, 0xAD, 0xBE, 0xEF]).await;
    client.send_raw(0x7F, &[]).await;
    client.handshake(VERSION, NextState::Status).await;
    client.send(0x00, &StatusRequest).await;

    client.recv_as::<StatusResponse>(0x00).await;
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_status_for_unsupported_version_uses_baseline() {
    let server = server();
    let addr = server.start().await.unwrap();

    let mut client = Client::connect(addr).await;
    client.handshake(ProtocolVersion::from_raw(47), NextState::Status).await;
    client.send(0x00, &StatusRequest).await;

    let response = client.recv_as::<StatusResponse>(0x00).await;
    let status: Value = serde_json::from_str(&response.json).unwrap();
    assert_eq!(status["version"]["protocol"], 754);

    server.stop().await.unwrap();
}

// =========================================================================
// Login and sessions
// =========================================================================

#[tokio::test]
async fn test_login_registers_session() {
    let server = server();
    let addr = server.start().await.unwrap();

    let mut client = Client::connect(addr).await;
    let success = client.login("Notch").await;
    assert_eq!(success.username, "Notch");
    assert_eq!(success.uuid.get_version_num(), 4);

    eventually(|| server.get_session(success.uuid).is_some()).await;
    let session = server.get_session(success.uuid).unwrap();
    assert_eq!(session.profile().unwrap().username, "Notch");
    assert_eq!(session.version(), VERSION);
    assert_eq!(server.session_count(), 1);

    let mut seen = Vec::new();
    server.for_each_session(|conn| seen.push(conn.uuid()));
    assert_eq!(seen, vec![Some(success.uuid)]);

    drop(client);
    eventually(|| server.session_count() == 0).await;
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_login_with_unsupported_version_is_refused() {
    let server = server();
    let addr = server.start().await.unwrap();

    let mut client = Client::connect(addr).await;
    client.handshake(ProtocolVersion::from_raw(47), NextState::Login).await;
    client.send(0x00, &LoginStart::new("Oldie")).await;

    let disconnect = client.recv_as::<LoginDisconnect>(0x00).await;
    let reason: Value = serde_json::from_str(&disconnect.reason).unwrap();
    assert!(
        reason["text"]
            .as_str()
            .unwrap()
            .starts_with("Unsupported client version")
    );
    assert!(client.closed().await);
    assert_eq!(server.session_count(), 0);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_keep_alive_round_trip() {
    let server = server_with(
        ServerConfig::default().with_keep_alive_interval(Duration::from_millis(50)),
    );
    let addr = server.start().await.unwrap();

    let mut client = Client::connect(addr).await;
    let success = client.login("Steve").await;

    let keep_alive = client.recv_as::<ClientboundKeepAlive>(0x1F).await;
    client
        .send(0x10, &ServerboundKeepAlive { id: keep_alive.id })
        .await;

    eventually(|| {
        server
            .get_session(success.uuid)
            .and_then(|conn| conn.last_keep_alive_ack())
            .is_some()
    })
    .await;

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_silent_client_times_out() {
    let server = server_with(
        ServerConfig::default().with_read_timeout(Some(Duration::from_millis(100))),
    );
    let addr = server.start().await.unwrap();

    let mut client = Client::connect(addr).await;
    client.handshake(VERSION, NextState::Login).await;

    let disconnect = client.recv_as::<LoginDisconnect>(0x00).await;
    assert_eq!(disconnect.reason, r#"{"text":"Timed out"}"#);
    assert!(client.closed().await);

    server.stop().await.unwrap();
}

// =========================================================================
// Broadcast
// =========================================================================

#[tokio::test]
async fn test_broadcast_reaches_play_sessions() {
    let server = server();
    let addr = server.start().await.unwrap();

    let mut players = Vec::new();
    for name in ["alpha", "beta"] {
        let mut client = Client::connect(addr).await;
        client.login(name).await;
        players.push(client);
    }
    eventually(|| server.session_count() == 2).await;

    // A client still in status is not a session
    let mut pinger = Client::connect(addr).await;
    pinger.handshake(VERSION, NextState::Status).await;

    let sent = server
        .broadcast(&ServerDifficulty {
            difficulty: 2,
            locked: true,
        })
        .await;
    assert_eq!(sent, 2);

    for client in &mut players {
        let difficulty = client.recv_as::<ServerDifficulty>(0x0D).await;
        assert_eq!(difficulty.difficulty, 2);
        assert!(difficulty.locked);
    }

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_broadcasts_keep_frames_intact() {
    let server = server();
    let addr = server.start().await.unwrap();

    let mut client = Client::connect(addr).await;
    client.login("reader").await;
    eventually(|| server.session_count() == 1).await;

    const TASKS: i32 = 4;
    const PER_TASK: i32 = 100;

    let senders: Vec<_> = (0..TASKS)
        .map(|task| {
            let server = server.clone();
            tokio::spawn(async move {
                for n in 0..PER_TASK {
                    let teleport_id = task * 10_000 + n;
                    let packet = PlayerPositionAndLook {
                        x: f64::from(teleport_id),
                        y: 64.0,
                        z: -f64::from(teleport_id),
                        yaw: 0.0,
                        pitch: 0.0,
                        flags: 0,
                        teleport_id,
                    };
                    assert_eq!(server.broadcast(&packet).await, 1);
                }
            })
        })
        .collect();

    let mut next_expected = vec![0; TASKS as usize];
    for _ in 0..TASKS * PER_TASK {
        let packet = client.recv_as::<PlayerPositionAndLook>(0x34).await;
        assert_eq!(packet.x, f64::from(packet.teleport_id));
        assert_eq!(packet.z, -f64::from(packet.teleport_id));

        // Each sender's frames arrive whole and in its own order
        let task = (packet.teleport_id / 10_000) as usize;
        assert_eq!(packet.teleport_id % 10_000, next_expected[task]);
        next_expected[task] += 1;
    }

    for sender in senders {
        sender.await.unwrap();
    }
    server.stop().await.unwrap();
}

// =========================================================================
// Lifecycle
// =========================================================================

#[tokio::test]
async fn test_stop_kicks_sessions_and_restart_works() {
    let server = server();
    let addr = server.start().await.unwrap();

    let mut players = Vec::new();
    for n in 0..3 {
        let mut client = Client::connect(addr).await;
        client.login(&format!("player{n}")).await;
        players.push(client);
    }
    eventually(|| server.session_count() == 3).await;

    server.stop().await.unwrap();
    assert!(!server.is_running());
    assert_eq!(server.session_count(), 0);

    let expected = serde_json::json!({ "text": SHUTDOWN_REASON }).to_string();
    for client in &mut players {
        let disconnect = client.recv_as::<PlayDisconnect>(0x19).await;
        assert_eq!(disconnect.reason, expected);
        assert!(client.closed().await);
    }

    assert!(matches!(server.stop().await, Err(ServerError::AlreadyStopped)));

    let addr = server.start().await.unwrap();
    assert!(server.is_running());

    let mut client = Client::connect(addr).await;
    let success = client.login("returning").await;
    eventually(|| server.get_session(success.uuid).is_some()).await;
    assert_eq!(server.session_count(), 1);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_start_while_running() {
    let server = server();
    server.start().await.unwrap();
    assert!(matches!(server.start().await, Err(ServerError::AlreadyRunning)));
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_unique_session_ids() {
    let server = server();
    let addr = server.start().await.unwrap();

    let mut a = Client::connect(addr).await;
    let mut b = Client::connect(addr).await;
    let first: Uuid = a.login("same").await.uuid;
    let second: Uuid = b.login("same").await.uuid;
    assert_ne!(first, second);

    eventually(|| server.session_count() == 2).await;
    server.stop().await.unwrap();
}
