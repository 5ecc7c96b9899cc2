//! Device facade
//!
//! [`Device`] composes the command registry and the session engine into
//! the public API: start/stop, friendly sends, queries, raw sends and the
//! message/connection callbacks.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{info, warn};

use onkyoctl_core::{CommandSet, FriendlyValue, IscpCommand};

use crate::config::DeviceConfig;
use crate::error::{ClientError, Result};
use crate::session::{ConnectionState, SessionConfig, SessionHandle};

type MessageCallback = Box<dyn Fn(&str, &str) + Send + Sync>;
type ConnectionCallback = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    message: RwLock<Option<MessageCallback>>,
    connected: RwLock<Option<ConnectionCallback>>,
    disconnected: RwLock<Option<ConnectionCallback>>,
}

/// A network-attached eISCP receiver.
pub struct Device {
    config: DeviceConfig,
    commands: Arc<CommandSet>,
    callbacks: Arc<Callbacks>,
    session: Mutex<Option<SessionHandle>>,
}

impl Device {
    /// Create a device from the given configuration.
    ///
    /// When `command_file` is set it is loaded here and replaces the
    /// configured command set.
    pub fn new(config: DeviceConfig) -> Result<Self> {
        let commands = match &config.command_file {
            Some(path) => CommandSet::from_yaml_file(path)?,
            None => config.commands.clone(),
        };
        Ok(Self {
            commands: Arc::new(commands),
            callbacks: Arc::new(Callbacks::default()),
            session: Mutex::new(None),
            config,
        })
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Set the handler for received messages, replacing any existing one.
    ///
    /// The handler runs on the session's dispatch task and must not
    /// block; spawn a task for anything that awaits.
    pub fn on_message(&self, callback: impl Fn(&str, &str) + Send + Sync + 'static) {
        *self.callbacks.message.write() = Some(Box::new(callback));
    }

    /// Called when the device is (re-)connected.
    pub fn on_connected(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.callbacks.connected.write() = Some(Box::new(callback));
    }

    /// Called when the connection is lost or closed.
    pub fn on_disconnected(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.callbacks.disconnected.write() = Some(Box::new(callback));
    }

    /// Connect to the device and start receiving messages.
    ///
    /// A no-op when already started.
    pub async fn start(&self) -> Result<()> {
        if self.session.lock().is_some() {
            return Ok(());
        }
        if self.config.host.is_empty() {
            return Err(ClientError::ConnectionFailed("no host configured".into()));
        }
        info!("start device {}:{}", self.config.host, self.config.port);

        let commands = self.commands.clone();
        let callbacks = self.callbacks.clone();
        let on_message = Arc::new(move |command: IscpCommand| {
            match commands.read_command(&command) {
                Ok((name, value)) => {
                    if let Some(callback) = callbacks.message.read().as_ref() {
                        callback(&name, &value);
                    }
                }
                Err(error) => warn!("ignoring {command}: {error}"),
            }
        });

        let callbacks = self.callbacks.clone();
        let on_state = Arc::new(move |state: ConnectionState| match state {
            ConnectionState::Connected => {
                if let Some(callback) = callbacks.connected.read().as_ref() {
                    callback();
                }
            }
            ConnectionState::Disconnected => {
                if let Some(callback) = callbacks.disconnected.read().as_ref() {
                    callback();
                }
            }
            _ => {}
        });

        let session = SessionHandle::spawn(SessionConfig {
            host: self.config.host.clone(),
            port: self.config.port,
            connect_timeout: self.config.connect_timeout,
            reconnect_delay: self.config.reconnect_delay,
            allow_reconnect: self.config.allow_reconnect,
            on_state,
            on_message,
        });

        // grace on top of the dial's own timeout
        let wait = self.config.connect_timeout + Duration::from_secs(1);
        match session.connect_wait(wait).await {
            Ok(()) => {
                *self.session.lock() = Some(session);
                Ok(())
            }
            Err(error) => {
                session.stop().await;
                Err(error)
            }
        }
    }

    /// Disconnect and stop message processing.
    pub async fn stop(&self) {
        let session = self.session.lock().take();
        if let Some(session) = session {
            info!("stop device {}:{}", self.config.host, self.config.port);
            session.stop().await;
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.session
            .lock()
            .as_ref()
            .map(SessionHandle::state)
            .unwrap_or(ConnectionState::Disconnected)
    }

    /// Send a friendly command, e.g. `("power", "on")`.
    pub async fn send_friendly(
        &self,
        name: &str,
        value: impl Into<FriendlyValue>,
    ) -> Result<()> {
        let command = self.commands.create_command(name, value)?;
        self.send_raw(command, self.config.send_timeout).await
    }

    /// Send the `QSTN` query for the given friendly name. The reply
    /// arrives through the message callback.
    pub async fn query(&self, name: &str) -> Result<()> {
        let command = self.commands.create_query(name)?;
        self.send_raw(command, self.config.send_timeout).await
    }

    /// Send a raw ISCP command, waiting up to `timeout` for it to be
    /// written out.
    ///
    /// A zero timeout enqueues without waiting. On `Timeout` the command
    /// may still be sent later. With `auto_connect`, a connect is issued
    /// first and the wait for `Connected` is bounded by the same timeout.
    pub async fn send_raw(&self, command: IscpCommand, timeout: Duration) -> Result<()> {
        let session = self.session()?;
        let started = Instant::now();

        if self.config.auto_connect && session.state() != ConnectionState::Connected {
            if timeout.is_zero() {
                session.connect().await?;
            } else {
                session.connect_wait(timeout).await?;
            }
        }

        let remaining = timeout.saturating_sub(started.elapsed());
        session.send(command, remaining).await
    }

    fn session(&self) -> Result<SessionHandle> {
        self.session.lock().clone().ok_or(ClientError::NotStarted)
    }
}
