//! A single client connection.
//!
//! The read half is owned by [`Connection::run`]; the write half lives
//! behind a mutex so replies from the read loop, keep-alives and broadcasts
//! from other tasks can share it. Each frame goes out in one `write_all`
//! under the lock, so frames never interleave.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use obsidian_mc::codec::{encode_frame, read_frame};
use obsidian_mc::packets::{ClientboundKeepAlive, LoginDisconnect, PlayDisconnect};
use obsidian_mc::{
    Buffer, ConnectionState, Direction, Packet, PacketRegistry, ProtocolError, ProtocolVersion,
    RawPacket,
};
use rand::Rng;
use serde_json::json;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, watch};
use tokio::time::{self, Instant};
use tracing::{Instrument, Span, debug, trace, warn};
use uuid::Uuid;

use crate::error::ConnectionError;
use crate::handler::{Flow, PacketHandler};

/// Inbound half of a connection's stream.
pub type Reader = Box<dyn AsyncRead + Send + Unpin>;

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Upper bound on flushing a goodbye to a client that is not reading.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Upper bound on writing one frame before the client is dropped.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity assigned to a connection at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Session identity.
    pub uuid: Uuid,
    /// Name the client logged in with.
    pub username: String,
}

/// One client connection and its protocol state.
pub struct Connection {
    id: u64,
    peer: SocketAddr,
    registry: Arc<PacketRegistry>,
    read_timeout: Option<Duration>,
    state: AtomicU8,
    version: AtomicI32,
    profile: OnceLock<Profile>,
    keep_alive_sent: AtomicI64,
    keep_alive_acked: AtomicI64,
    writer: Mutex<Option<Writer>>,
    closed: watch::Sender<bool>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("state", &self.state())
            .field("version", &self.version())
            .field("profile", &self.profile.get())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Wrap `stream` in a new connection in the `Handshaking` state.
    ///
    /// Returns the shared connection and the read half to hand to [`run`](Self::run).
    pub fn new<S>(
        id: u64,
        peer: SocketAddr,
        stream: S,
        registry: Arc<PacketRegistry>,
        read_timeout: Option<Duration>,
    ) -> (Arc<Self>, Reader)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let reader: Reader = Box::new(reader);
        let writer: Writer = Box::new(writer);
        let (closed, _) = watch::channel(false);

        let conn = Arc::new(Self {
            id,
            peer,
            registry,
            read_timeout,
            state: AtomicU8::new(ConnectionState::Handshaking as u8),
            version: AtomicI32::new(ProtocolVersion::UNKNOWN.as_raw()),
            profile: OnceLock::new(),
            keep_alive_sent: AtomicI64::new(0),
            keep_alive_acked: AtomicI64::new(0),
            writer: Mutex::new(Some(writer)),
            closed,
        });

        (conn, reader)
    }

    /// Server-assigned connection number.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Remote address.
    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Current protocol state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
            .unwrap_or(ConnectionState::Handshaking)
    }

    /// Version whose packet table this connection uses.
    ///
    /// [`ProtocolVersion::UNKNOWN`] before the handshake, or when the client
    /// declared a version with no table of its own.
    #[must_use]
    pub fn version(&self) -> ProtocolVersion {
        ProtocolVersion::from_raw(self.version.load(Ordering::Acquire))
    }

    /// Login identity, once the connection has logged in.
    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.get()
    }

    /// Session identity, once the connection has logged in.
    #[must_use]
    pub fn uuid(&self) -> Option<Uuid> {
        self.profile.get().map(|profile| profile.uuid)
    }

    /// Whether [`close`](Self::close) has been called or the stream failed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// The most recent keep-alive ID the client echoed back.
    #[must_use]
    pub fn last_keep_alive_ack(&self) -> Option<i64> {
        let id = self.keep_alive_acked.load(Ordering::Acquire);
        (id != 0).then_some(id)
    }

    /// Move to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::InvalidTransition`] unless `to` directly
    /// follows the current state.
    pub fn transition(&self, to: ConnectionState) -> Result<(), ConnectionError> {
        let mut from = self.state();
        loop {
            if !from.can_transition_to(to) {
                return Err(ConnectionError::InvalidTransition { from, to });
            }
            match self.state.compare_exchange(
                from as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    debug!(%from, %to, "State changed");
                    return Ok(());
                }
                Err(actual) => from = ConnectionState::from_u8(actual).unwrap_or(from),
            }
        }
    }

    pub(crate) fn set_version(&self, version: ProtocolVersion) {
        self.version.store(version.as_raw(), Ordering::Release);
    }

    /// Returns `false` if a profile was already set.
    pub(crate) fn set_profile(&self, profile: Profile) -> bool {
        self.profile.set(profile).is_ok()
    }

    pub(crate) fn acknowledge_keep_alive(&self, id: i64) {
        let expected = self.keep_alive_sent.load(Ordering::Acquire);
        if id != expected {
            debug!(id, expected, "Keep-alive ID mismatch");
        }
        self.keep_alive_acked.store(id, Ordering::Release);
    }

    /// Encode `packet` for this connection's version and write it as one frame.
    ///
    /// # Errors
    ///
    /// Fails if the packet is not clientbound or not valid in the current
    /// state, if the version has no ID for it, if encoding fails, or if the
    /// connection is closed or the write fails. A failed write closes the
    /// connection.
    pub async fn send<P: Packet>(&self, packet: &P) -> Result<(), ConnectionError> {
        if P::DIRECTION != Direction::ClientBound {
            return Err(ConnectionError::WrongDirection { kind: P::KIND });
        }
        let state = self.state();
        if P::STATE != state {
            return Err(ConnectionError::WrongState {
                kind: P::KIND,
                expected: P::STATE,
                actual: state,
            });
        }

        let version = self.version();
        let id = packet.resolve_id(&self.registry, version)?;
        let mut payload = Buffer::new();
        packet.encode(&mut payload, version)?;
        let frame = encode_frame(id, &payload)?;

        self.write_frame(&frame).await?;
        trace!(kind = %P::KIND, id, len = frame.len(), "Sent packet");
        Ok(())
    }

    /// Write one frame under the writer lock.
    ///
    /// A write that is still pending when the connection closes, or that
    /// outlives [`WRITE_TIMEOUT`], is abandoned and the write half dropped.
    async fn write_frame(&self, frame: &[u8]) -> Result<(), ConnectionError> {
        let mut closed = self.closed.subscribe();
        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Err(ConnectionError::Closed);
        };

        let error = tokio::select! {
            _ = closed.wait_for(|stop| *stop) => ConnectionError::Closed,
            written = time::timeout(WRITE_TIMEOUT, write_all_flush(writer, frame)) => match written {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => e.into(),
                Err(_) => ConnectionError::WriteTimedOut,
            },
        };

        // A partial frame may be on the wire; nothing after it is readable
        guard.take();
        self.closed.send_replace(true);
        Err(error)
    }

    /// Send a disconnect message with `reason` if the state has one, then close.
    pub async fn disconnect(&self, reason: &str) {
        let json = json!({ "text": reason }).to_string();
        let sent = match self.state() {
            ConnectionState::Login => {
                time::timeout(
                    DISCONNECT_TIMEOUT,
                    self.send(&LoginDisconnect::from_json(json)),
                )
                .await
            }
            ConnectionState::Play => {
                time::timeout(
                    DISCONNECT_TIMEOUT,
                    self.send(&PlayDisconnect::from_json(json)),
                )
                .await
            }
            ConnectionState::Handshaking | ConnectionState::Status => Ok(Ok(())),
        };

        match sent {
            Ok(Ok(())) => debug!(reason, "Disconnecting"),
            Ok(Err(e)) => debug!(reason, "Failed to send disconnect: {e}"),
            Err(_) => debug!(reason, "Timed out sending disconnect"),
        }

        self.close().await;
    }

    /// Stop the read loop and shut down the write half. Safe to call more than once.
    pub async fn close(&self) {
        self.closed.send_replace(true);

        let Ok(mut guard) = time::timeout(DISCONNECT_TIMEOUT, self.writer.lock()).await else {
            warn!("Writer still busy, leaving it to the pending send");
            return;
        };
        if let Some(mut writer) = guard.take() {
            if let Err(e) = writer.shutdown().await {
                trace!("Shutdown failed: {e}");
            }
        }
    }

    /// Read and dispatch frames until the client leaves, the connection is
    /// closed, or the stream breaks. Always ends closed.
    pub async fn run<H: PacketHandler>(self: &Arc<Self>, mut reader: Reader, handler: &H) {
        let mut closed = self.closed.subscribe();

        loop {
            let next = tokio::select! {
                _ = closed.wait_for(|stop| *stop) => break,
                next = self.read_next(&mut reader) => next,
            };

            let raw = match next {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    debug!("Client closed connection");
                    break;
                }
                Err(ConnectionError::TimedOut) => {
                    debug!("Read timed out");
                    self.disconnect("Timed out").await;
                    break;
                }
                Err(e) => {
                    log_dropped(&e);
                    break;
                }
            };

            match self.process(raw, handler).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Close) => break,
                Err(e) if e.is_fatal() => {
                    log_dropped(&e);
                    break;
                }
                Err(e) => {
                    warn!("Handler failed: {e}");
                    self.disconnect(&e.to_string()).await;
                    break;
                }
            }
        }

        self.close().await;
    }

    async fn read_next(&self, reader: &mut Reader) -> Result<Option<RawPacket>, ConnectionError> {
        let frame = read_frame(reader);
        let result = match self.read_timeout {
            Some(limit) => time::timeout(limit, frame)
                .await
                .map_err(|_| ConnectionError::TimedOut)?,
            None => frame.await,
        };
        Ok(result?)
    }

    async fn process<H: PacketHandler>(
        self: &Arc<Self>,
        mut raw: RawPacket,
        handler: &H,
    ) -> Result<Flow, ConnectionError> {
        let state = self.state();
        let version = self.version();

        let packet = match self.registry.decode(
            version,
            state,
            Direction::ServerBound,
            raw.id,
            &mut raw.payload,
        ) {
            Ok(packet) => packet,
            Err(e) if e.is_unknown_packet() => {
                let skipped = raw.payload.skip_remaining();
                debug!(id = raw.id, skipped, %state, "Skipping unknown packet");
                return Ok(Flow::Continue);
            }
            Err(e) => return Err(e.into()),
        };

        let remaining = raw.payload.remaining();
        if remaining > 0 {
            return Err(ProtocolError::TrailingBytes {
                kind: packet.kind().name(),
                remaining,
            }
            .into());
        }

        trace!(kind = %packet.kind(), id = raw.id, "Received packet");
        handler.handle(self, packet).await
    }

    /// Send a [`ClientboundKeepAlive`] every `interval` until the connection closes.
    pub fn start_keep_alive(self: &Arc<Self>, interval: Duration) {
        let conn = Arc::clone(self);
        let mut closed = self.closed.subscribe();

        tokio::spawn(
            async move {
                let mut ticker = time::interval_at(Instant::now() + interval, interval);
                loop {
                    tokio::select! {
                        _ = closed.wait_for(|stop| *stop) => break,
                        _ = ticker.tick() => {}
                    }

                    let id = next_keep_alive_id();
                    conn.keep_alive_sent.store(id, Ordering::Release);
                    if let Err(e) = conn.send(&ClientboundKeepAlive { id }).await {
                        debug!("Keep-alive failed: {e}");
                        break;
                    }
                    trace!(id, "Sent keep-alive");
                }
            }
            .instrument(Span::current()),
        );
    }
}

fn log_dropped(error: &ConnectionError) {
    if error.is_expected_close() {
        debug!("Connection closed: {error}");
    } else {
        warn!("Dropping connection: {error}");
    }
}

async fn write_all_flush(writer: &mut Writer, frame: &[u8]) -> io::Result<()> {
    writer.write_all(frame).await?;
    writer.flush().await
}

/// Non-zero, so zero can mean "no acknowledgement yet".
fn next_keep_alive_id() -> i64 {
    rand::rng().random_range(1..=i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use obsidian_mc::codec::write_frame;
    use obsidian_mc::packets::{
        Handshake, NextState, Ping, StatusRequest, StatusResponse,
    };
    use obsidian_mc::{AnyPacket, PacketKind, default_registry};
    use std::future::Future;
    use tokio::io::{AsyncReadExt, DuplexStream};

    #[derive(Default)]
    struct Recorder {
        seen: std::sync::Mutex<Vec<PacketKind>>,
    }

    impl Recorder {
        fn seen(&self) -> Vec<PacketKind> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl PacketHandler for Recorder {
        fn handle(
            &self,
            conn: &Arc<Connection>,
            packet: Box<dyn AnyPacket>,
        ) -> impl Future<Output = Result<Flow, ConnectionError>> + Send {
            self.seen.lock().unwrap().push(packet.kind());
            let result = match packet.downcast_ref::<Handshake>() {
                Some(handshake) => conn
                    .transition(handshake.next_state.state())
                    .map(|()| Flow::Continue),
                None => Ok(Flow::Continue),
            };
            async move { result }
        }
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn connect(read_timeout: Option<Duration>) -> (Arc<Connection>, Reader, DuplexStream) {
        let registry = Arc::new(default_registry().unwrap());
        let (server, client) = tokio::io::duplex(64 * 1024);
        let (conn, reader) = Connection::new(1, peer(), server, registry, read_timeout);
        (conn, reader, client)
    }

    async fn send_raw(client: &mut DuplexStream, id: i32, payload: &[u8]) {
        let mut buf = Buffer::new();
        buf.write_bytes(payload).unwrap();
        write_frame(client, &RawPacket::new(id, buf)).await.unwrap();
    }

    async fn send_packet<P: Packet>(client: &mut DuplexStream, id: i32, packet: &P) {
        let mut buf = Buffer::new();
        packet.encode(&mut buf, ProtocolVersion::V1_16_4).unwrap();
        write_frame(client, &RawPacket::new(id, buf)).await.unwrap();
    }

    fn status_handshake() -> Handshake {
        Handshake {
            protocol_version: ProtocolVersion::V1_16_4,
            server_address: "localhost".to_string(),
            server_port: 25565,
            next_state: NextState::Status,
        }
    }

    #[tokio::test]
    async fn test_unknown_packet_keeps_connection_open() {
        let (conn, reader, mut client) = connect(None);
        let recorder = Recorder::default();

        send_raw(&mut client, 0x7F, &[1, 2, 3, 4]).await;
        send_packet(&mut client, 0x00, &status_handshake()).await;
        send_packet(&mut client, 0x00, &StatusRequest).await;
        drop(client);

        conn.run(reader, &recorder).await;

        assert_eq!(recorder.seen(), vec![Handshake::KIND, StatusRequest::KIND]);
        assert_eq!(conn.state(), ConnectionState::Status);
        assert!(conn.is_closed());
    }

    #[tokio::test]
    async fn test_trailing_bytes_are_fatal() {
        let (conn, reader, mut client) = connect(None);
        let recorder = Recorder::default();

        let mut payload = Buffer::new();
        status_handshake()
            .encode(&mut payload, ProtocolVersion::V1_16_4)
            .unwrap();
        payload.write_u8(0xAA).unwrap();
        write_frame(&mut client, &RawPacket::new(0x00, payload))
            .await
            .unwrap();
        send_packet(&mut client, 0x00, &status_handshake()).await;

        conn.run(reader, &recorder).await;

        assert!(recorder.seen().is_empty());
        assert_eq!(conn.state(), ConnectionState::Handshaking);

        // Server side shut down without writing anything
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_truncated_payload_is_fatal() {
        let (conn, reader, mut client) = connect(None);
        let recorder = Recorder::default();

        send_packet(&mut client, 0x00, &status_handshake()).await;
        // Ping needs 8 bytes
        send_raw(&mut client, 0x01, &[0, 0, 0]).await;
        send_packet(&mut client, 0x00, &StatusRequest).await;

        conn.run(reader, &recorder).await;
        assert_eq!(recorder.seen(), vec![Handshake::KIND]);
    }

    #[tokio::test]
    async fn test_read_timeout_closes() {
        let (conn, reader, mut client) = connect(Some(Duration::from_millis(50)));
        let recorder = Recorder::default();

        conn.run(reader, &recorder).await;
        assert!(conn.is_closed());

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_close_stops_run() {
        let (conn, reader, _client) = connect(None);
        let recorder = Arc::new(Recorder::default());

        let task = {
            let conn = Arc::clone(&conn);
            let recorder = Arc::clone(&recorder);
            tokio::spawn(async move { conn.run(reader, &*recorder).await })
        };

        conn.close().await;
        conn.close().await;
        time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            conn.send(&StatusResponse::new("{}")).await,
            Err(ConnectionError::WrongState { .. })
        ));
    }

    #[tokio::test]
    async fn test_send_after_close() {
        let (conn, _reader, _client) = connect(None);
        conn.transition(ConnectionState::Status).unwrap();
        conn.close().await;

        assert!(matches!(
            conn.send(&StatusResponse::new("{}")).await,
            Err(ConnectionError::Closed)
        ));
    }

    fn stalled_status_connection() -> (Arc<Connection>, DuplexStream) {
        let registry = Arc::new(default_registry().unwrap());
        // Far smaller than the frames below, and nobody reads the other end
        let (server, client) = tokio::io::duplex(64);
        let (conn, _reader) = Connection::new(3, peer(), server, registry, None);
        conn.transition(ConnectionState::Status).unwrap();
        (conn, client)
    }

    #[tokio::test]
    async fn test_close_releases_blocked_send() {
        let (conn, _client) = stalled_status_connection();

        let pending = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.send(&StatusResponse::new("x".repeat(4096))).await })
        };
        time::sleep(Duration::from_millis(50)).await;
        assert!(!pending.is_finished());

        time::timeout(Duration::from_secs(1), conn.close())
            .await
            .unwrap();
        let result = time::timeout(Duration::from_secs(1), pending)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(ConnectionError::Closed)));
        assert!(conn.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_write_times_out() {
        let (conn, _client) = stalled_status_connection();

        let err = conn
            .send(&StatusResponse::new("x".repeat(4096)))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::WriteTimedOut));
        assert!(conn.is_closed());
        assert!(matches!(
            conn.send(&StatusResponse::new("{}")).await,
            Err(ConnectionError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_send_checks_state_and_direction() {
        let (conn, _reader, _client) = connect(None);

        let err = conn.send(&StatusResponse::new("{}")).await.unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::WrongState {
                expected: ConnectionState::Status,
                actual: ConnectionState::Handshaking,
                ..
            }
        ));

        conn.transition(ConnectionState::Status).unwrap();
        let err = conn.send(&Ping::new(1)).await.unwrap_err();
        assert!(matches!(err, ConnectionError::WrongDirection { .. }));
    }

    #[tokio::test]
    async fn test_play_packets_need_a_version_table() {
        let (conn, _reader, _client) = connect(None);
        conn.transition(ConnectionState::Login).unwrap();
        conn.transition(ConnectionState::Play).unwrap();

        // Still on the baseline table, which has no play IDs
        let err = conn
            .send(&ClientboundKeepAlive { id: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::Protocol(_)));

        conn.set_version(ProtocolVersion::V1_16_4);
        conn.send(&ClientboundKeepAlive { id: 1 }).await.unwrap();
    }

    #[test]
    fn test_transitions() {
        let registry = Arc::new(default_registry().unwrap());
        let (stream, _other) = tokio::io::duplex(64);
        let (conn, _reader) = Connection::new(7, peer(), stream, registry, None);

        assert_eq!(conn.state(), ConnectionState::Handshaking);
        assert!(matches!(
            conn.transition(ConnectionState::Play),
            Err(ConnectionError::InvalidTransition {
                from: ConnectionState::Handshaking,
                to: ConnectionState::Play,
            })
        ));

        conn.transition(ConnectionState::Login).unwrap();
        assert!(conn.transition(ConnectionState::Status).is_err());
        assert!(conn.transition(ConnectionState::Handshaking).is_err());
        conn.transition(ConnectionState::Play).unwrap();
        assert!(conn.transition(ConnectionState::Login).is_err());
        assert_eq!(conn.state(), ConnectionState::Play);
    }

    #[tokio::test]
    async fn test_disconnect_in_login_sends_reason() {
        let (conn, _reader, mut client) = connect(None);
        conn.transition(ConnectionState::Login).unwrap();

        conn.disconnect("Go away").await;
        assert!(conn.is_closed());

        let mut raw = read_frame(&mut client).await.unwrap().unwrap();
        assert_eq!(raw.id, 0x00);
        let packet = LoginDisconnect::decode(&mut raw.payload, ProtocolVersion::UNKNOWN).unwrap();
        assert_eq!(packet.reason, r#"{"text":"Go away"}"#);
        assert!(read_frame(&mut client).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_sends_do_not_interleave() {
        let (conn, _reader, mut client) = connect(None);
        conn.transition(ConnectionState::Status).unwrap();

        const PER_TASK: usize = 50;
        let senders: Vec<_> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|tag| {
                let conn = Arc::clone(&conn);
                tokio::spawn(async move {
                    let body = tag.repeat(5000);
                    for _ in 0..PER_TASK {
                        conn.send(&StatusResponse::new(body.clone())).await.unwrap();
                    }
                })
            })
            .collect();

        let reader = tokio::spawn(async move {
            let mut frames = 0;
            while frames < PER_TASK * 4 {
                let mut raw = read_frame(&mut client).await.unwrap().unwrap();
                assert_eq!(raw.id, 0x00);
                let response =
                    StatusResponse::decode(&mut raw.payload, ProtocolVersion::UNKNOWN).unwrap();
                assert_eq!(raw.payload.remaining(), 0);

                let first = response.json.chars().next().unwrap();
                assert_eq!(response.json.len(), 5000);
                assert!(response.json.chars().all(|c| c == first));
                frames += 1;
            }
            frames
        });

        for sender in senders {
            sender.await.unwrap();
        }
        assert_eq!(reader.await.unwrap(), PER_TASK * 4);
    }

    #[tokio::test]
    async fn test_keep_alive_ack() {
        let (conn, _reader, _client) = connect(None);
        assert_eq!(conn.last_keep_alive_ack(), None);

        conn.keep_alive_sent.store(99, Ordering::Release);
        conn.acknowledge_keep_alive(99);
        assert_eq!(conn.last_keep_alive_ack(), Some(99));
    }

    #[tokio::test]
    async fn test_keep_alive_task_sends_until_closed() {
        let (conn, _reader, mut client) = connect(None);
        conn.set_version(ProtocolVersion::V1_16);
        conn.transition(ConnectionState::Login).unwrap();
        conn.transition(ConnectionState::Play).unwrap();

        conn.start_keep_alive(Duration::from_millis(20));

        let mut raw = read_frame(&mut client).await.unwrap().unwrap();
        assert_eq!(raw.id, 0x1F);
        let keep_alive =
            ClientboundKeepAlive::decode(&mut raw.payload, ProtocolVersion::V1_16).unwrap();
        assert_ne!(keep_alive.id, 0);

        conn.close().await;
        // Drain anything sent before the close, then expect EOF
        while read_frame(&mut client).await.unwrap().is_some() {}
    }
}
