//! Server configuration.

use std::time::Duration;

use crate::utils::{EnvError, env_bool, env_string, env_u32, env_u64};

/// Runtime settings for a [`Server`](crate::Server).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind (host:port).
    pub addr: String,
    /// Description shown in the server list.
    pub motd: String,
    /// Player cap shown in the server list.
    pub max_players: u32,
    /// Interval between clientbound keep-alives in Play.
    pub keep_alive_interval: Duration,
    /// Deadline for each inbound frame. `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// Report the live session count in status responses.
    pub online_count_in_status: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:25565".to_string(),
            motd: "An Obsidian Server".to_string(),
            max_players: 20,
            keep_alive_interval: Duration::from_secs(15),
            read_timeout: Some(Duration::from_secs(30)),
            online_count_in_status: true,
        }
    }
}

impl ServerConfig {
    /// Load the configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `ADDR` | `0.0.0.0:25565` |
    /// | `MOTD` | `An Obsidian Server` |
    /// | `MAX_PLAYERS` | `20` |
    /// | `KEEP_ALIVE_SECS` | `15` |
    /// | `READ_TIMEOUT_SECS` | `30` (`0` disables) |
    /// | `ONLINE_COUNT_IN_STATUS` | `true` |
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is set to a malformed value, or if
    /// `KEEP_ALIVE_SECS` is zero.
    pub fn from_env() -> Result<Self, EnvError> {
        let defaults = Self::default();

        let keep_alive_secs = env_u64("KEEP_ALIVE_SECS", defaults.keep_alive_interval.as_secs())?;
        if keep_alive_secs == 0 {
            return Err("KEEP_ALIVE_SECS: must be greater than zero".into());
        }

        let read_timeout_secs = env_u64("READ_TIMEOUT_SECS", 30)?;

        Ok(Self {
            addr: env_string("ADDR", &defaults.addr)?,
            motd: env_string("MOTD", &defaults.motd)?,
            max_players: env_u32("MAX_PLAYERS", defaults.max_players)?,
            keep_alive_interval: Duration::from_secs(keep_alive_secs),
            read_timeout: (read_timeout_secs > 0).then(|| Duration::from_secs(read_timeout_secs)),
            online_count_in_status: env_bool(
                "ONLINE_COUNT_IN_STATUS",
                defaults.online_count_in_status,
            )?,
        })
    }

    /// Set the bind address.
    #[must_use]
    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Set the server MOTD.
    #[must_use]
    pub fn with_motd(mut self, motd: impl Into<String>) -> Self {
        self.motd = motd.into();
        self
    }

    /// Set the maximum players shown in server status.
    #[must_use]
    pub const fn with_max_players(mut self, max_players: u32) -> Self {
        self.max_players = max_players;
        self
    }

    /// Set the keep-alive interval.
    #[must_use]
    pub const fn with_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = interval;
        self
    }

    /// Set the per-frame read deadline.
    #[must_use]
    pub const fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }
}
