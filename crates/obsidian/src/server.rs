//! Listener lifecycle and the live session map.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use dashmap::DashMap;
use obsidian_mc::{Packet, PacketRegistry};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::ServerError;

/// Reason sent to sessions when the server stops, and to logins that race a stop.
pub const SHUTDOWN_REASON: &str = "Server is shutting down";

/// Pause before accepting again after an accept error.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// A listening server.
///
/// Cloning is cheap; every clone controls the same server.
#[derive(Clone)]
pub struct Server {
    shared: Arc<Shared>,
}

/// State shared by the server handle, the accept loop and every connection task.
pub(crate) struct Shared {
    pub(crate) config: ServerConfig,
    pub(crate) registry: Arc<PacketRegistry>,
    pub(crate) sessions: DashMap<Uuid, Arc<Connection>>,
    running: AtomicBool,
    next_connection_id: AtomicU64,
    local_addr: RwLock<Option<SocketAddr>>,
    lifecycle: Mutex<Option<Running>>,
}

/// Handles of a started server.
struct Running {
    shutdown: watch::Sender<bool>,
    accept: JoinHandle<()>,
}

impl Shared {
    pub(crate) fn new(config: ServerConfig, registry: Arc<PacketRegistry>) -> Self {
        Self {
            config,
            registry,
            sessions: DashMap::new(),
            running: AtomicBool::new(false),
            next_connection_id: AtomicU64::new(0),
            local_addr: RwLock::new(None),
            lifecycle: Mutex::new(None),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    fn set_local_addr(&self, addr: Option<SocketAddr>) {
        if let Ok(mut slot) = self.local_addr.write() {
            *slot = addr;
        }
    }

    /// Drive one accepted socket until it closes.
    async fn serve(self: Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        let cid = self.next_connection_id.fetch_add(1, Ordering::Relaxed);

        async {
            if let Err(e) = stream.set_nodelay(true) {
                debug!("Failed to set TCP_NODELAY: {e}");
            }

            let (conn, reader) = Connection::new(
                cid,
                peer,
                stream,
                Arc::clone(&self.registry),
                self.config.read_timeout,
            );
            debug!("Accepted");

            conn.run(reader, &*self).await;

            if let Some(profile) = conn.profile() {
                self.sessions
                    .remove_if(&profile.uuid, |_, session| Arc::ptr_eq(session, &conn));
                info!(player = %profile.username, "Left");
            }
            debug!("Closed");
        }
        .instrument(info_span!(
            "conn",
            cid,
            ip = %peer.ip(),
            port = peer.port()
        ))
        .await;
    }
}

impl Server {
    /// Create a stopped server.
    #[must_use]
    pub fn new(config: ServerConfig, registry: Arc<PacketRegistry>) -> Self {
        Self {
            shared: Arc::new(Shared::new(config, registry)),
        }
    }

    /// Bind the configured address and start accepting connections.
    ///
    /// Returns the bound address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AlreadyRunning`] if the server is started, or
    /// [`ServerError::Io`] if binding fails.
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        let mut lifecycle = self.shared.lifecycle.lock().await;
        if lifecycle.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let listener = TcpListener::bind(&self.shared.config.addr).await?;
        let local_addr = listener.local_addr()?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        self.shared.running.store(true, Ordering::Release);
        self.shared.set_local_addr(Some(local_addr));

        let accept = tokio::spawn(accept_loop(
            Arc::clone(&self.shared),
            listener,
            shutdown_rx,
        ));
        *lifecycle = Some(Running { shutdown, accept });

        info!("Listening on {local_addr}");
        Ok(local_addr)
    }

    /// Kick every session, stop accepting and close the listener.
    ///
    /// Connection tasks are not aborted; each one sees its socket close and
    /// exits on its own.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AlreadyStopped`] if the server is not started.
    pub async fn stop(&self) -> Result<(), ServerError> {
        let mut lifecycle = self.shared.lifecycle.lock().await;
        let running = lifecycle.take().ok_or(ServerError::AlreadyStopped)?;
        self.shared.running.store(false, Ordering::Release);

        let sessions = self.shared.snapshot();
        let kicked = sessions.len();
        let mut kicks = JoinSet::new();
        for conn in sessions {
            kicks.spawn(async move { conn.disconnect(SHUTDOWN_REASON).await });
        }
        while kicks.join_next().await.is_some() {}

        running.shutdown.send_replace(true);
        if let Err(e) = running.accept.await {
            warn!("Accept loop ended abnormally: {e}");
        }

        self.shared.sessions.clear();
        self.shared.set_local_addr(None);

        info!(kicked, "Stopped");
        Ok(())
    }

    /// Whether the server is accepting connections.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Address the listener is bound to, while running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.shared.local_addr.read().ok().and_then(|addr| *addr)
    }

    /// The configuration the server was built with.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    /// The packet registry shared by every connection.
    #[must_use]
    pub fn registry(&self) -> &Arc<PacketRegistry> {
        &self.shared.registry
    }

    /// Look up a logged-in session.
    #[must_use]
    pub fn get_session(&self, uuid: Uuid) -> Option<Arc<Connection>> {
        self.shared
            .sessions
            .get(&uuid)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Call `f` for each logged-in session.
    ///
    /// Iterates over a snapshot, so `f` may itself add or remove sessions.
    pub fn for_each_session<F>(&self, mut f: F)
    where
        F: FnMut(&Arc<Connection>),
    {
        for conn in self.shared.snapshot() {
            f(&conn);
        }
    }

    /// Number of logged-in sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.shared.sessions.len()
    }

    /// Send `packet` to every session in Play.
    ///
    /// Sessions are written to concurrently, so a slow client only delays
    /// its own copy. Returns how many sends succeeded.
    pub async fn broadcast<P: Packet + Clone>(&self, packet: &P) -> usize {
        let packet = Arc::new(packet.clone());
        let mut sends = JoinSet::new();
        for conn in self.shared.snapshot() {
            let packet = Arc::clone(&packet);
            sends.spawn(async move {
                let result = conn.send(packet.as_ref()).await;
                if let Err(e) = &result {
                    debug!(cid = conn.id(), "Broadcast of {} failed: {e}", P::KIND);
                }
                result.is_ok()
            });
        }

        let mut sent = 0;
        while let Some(joined) = sends.join_next().await {
            if matches!(joined, Ok(true)) {
                sent += 1;
            }
        }
        sent
    }
}

async fn accept_loop(
    shared: Arc<Shared>,
    listener: TcpListener,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.wait_for(|stop| *stop) => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => {
                tokio::spawn(Arc::clone(&shared).serve(stream, peer));
            }
            Err(e) => {
                warn!("Failed to accept connection: {e}");
                time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }

    debug!("Accept loop stopped");
}
