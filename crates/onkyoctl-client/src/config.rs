//! Device configuration

use std::path::PathBuf;
use std::time::Duration;

use onkyoctl_core::CommandSet;

/// Configuration for a [`Device`](crate::Device).
///
/// All options have defaults except `host`, which must be set before
/// `start()`. When `command_file` is set, the file is loaded by
/// `Device::new` and replaces `commands`.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    /// Bounded wait applied by `send_friendly` and `query`.
    pub send_timeout: Duration,
    pub reconnect_delay: Duration,
    pub auto_connect: bool,
    pub allow_reconnect: bool,
    pub commands: CommandSet,
    pub command_file: Option<PathBuf>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: onkyoctl_core::DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
            send_timeout: Duration::from_secs(1),
            reconnect_delay: Duration::from_secs(5),
            auto_connect: false,
            allow_reconnect: false,
            commands: CommandSet::default_set(),
            command_file: None,
        }
    }
}

impl DeviceConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// A zero duration keeps the default.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.connect_timeout = timeout;
        }
        self
    }

    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn auto_connect(mut self, enabled: bool) -> Self {
        self.auto_connect = enabled;
        self
    }

    pub fn allow_reconnect(mut self, enabled: bool) -> Self {
        self.allow_reconnect = enabled;
        self
    }

    pub fn commands(mut self, commands: CommandSet) -> Self {
        self.commands = commands;
        self
    }

    pub fn command_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.command_file = Some(path.into());
        self
    }
}
