use std::time::Duration;

use crate::types::UserId;

pub struct NodeBuilder {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) ssl: bool,
    pub(crate) pass: String,
    pub(crate) shards: u64,
    pub(crate) id: Option<UserId>,
}

impl Default for NodeBuilder {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 2333,
            ssl: false,
            pass: "youshallnotpass".to_string(),
            shards: 1,
            id: None,
        }
    }
}

impl NodeBuilder {
    pub fn set_host(&mut self, host: impl ToString) -> &mut Self {
        self.host = host.to_string();
        self
    }

    pub fn set_port(&mut self, port: u16) -> &mut Self {
        self.port = port;
        self
    }

    pub fn set_password(&mut self, password: impl ToString) -> &mut Self {
        self.pass = password.to_string();
        self
    }

    pub fn set_shards(&mut self, shards: u64) -> &mut Self {
        self.shards = shards;
        self
    }

    pub fn set_user_id(&mut self, id: impl Into<UserId>) -> &mut Self {
        self.id = Some(id.into());
        self
    }

    pub fn set_ssl(&mut self, ssl: bool) -> &mut Self {
        self.ssl = ssl;
        self
    }

    pub(crate) fn rest_url(&self) -> String {
        if self.ssl { format!("https://{}:{}", self.host, self.port) } else { format!("http://{}:{}", self.host, self.port) }
    }

    pub(crate) fn socket_url(&self) -> String {
        if self.ssl { format!("wss://{}:{}", self.host, self.port) } else { format!("ws://{}:{}", self.host, self.port) }
    }
}

/// Bounds of the waits a player does.
#[derive(Debug, Clone, Copy)]
pub struct PlayerSettings {
    /// How long an empty queue is tolerated before the player leaves.
    pub idle_timeout: Duration,
    /// How long to wait for the node to confirm a track started.
    pub start_timeout: Duration,
    pub search_timeout: Duration,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(20),
            start_timeout: Duration::from_secs(10),
            search_timeout: Duration::from_secs(10),
        }
    }
}

/// Exponential backoff between connection attempts to a node.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub attempts: u8,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl ReconnectPolicy {
    /// Delay after the `failures`-th consecutive failed attempt.
    pub fn delay(&self, failures: u8) -> Duration {
        let exponent = u32::from(failures.saturating_sub(1)).min(16);
        let delay = self.base_delay.checked_mul(1 << exponent).unwrap_or(self.max_delay);

        delay.min(self.max_delay)
    }
}
