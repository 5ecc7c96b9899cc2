//! eISCP session engine
//!
//! A single writer task owns the TCP connection, the state machine and the
//! reconnect timer; callers talk to it through a [`SessionHandle`] over
//! bounded channels. A second task owns the read half of the socket while
//! connected and a dedicated dispatcher delivers inbound commands to the
//! message callback in arrival order.
//!
//! The dial runs on a helper task and reports back as an engine event, so
//! a disconnect or shutdown during `Connecting` abandons the attempt
//! instead of blocking on it. Internal events carry a connection
//! generation; events from a superseded connection are dropped.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use onkyoctl_core::{frame, IscpCommand, HEADER_SIZE};

use crate::error::{ClientError, Result};

/// Connection state of the session engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
        };
        f.write_str(name)
    }
}

/// Callback invoked on every connection state change, in transition order.
pub type StateCallback = Arc<dyn Fn(ConnectionState) + Send + Sync>;

/// Callback invoked for every inbound command, in arrival order.
pub type MessageCallback = Arc<dyn Fn(IscpCommand) + Send + Sync>;

/// Largest inbound payload the read task will accept.
const MAX_PAYLOAD: usize = 4096;

pub(crate) struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub reconnect_delay: Duration,
    pub allow_reconnect: bool,
    pub on_state: StateCallback,
    pub on_message: MessageCallback,
}

type ConnectReply = Option<oneshot::Sender<Result<()>>>;

struct SendTask {
    command: IscpCommand,
    reply: oneshot::Sender<Result<()>>,
}

enum Event {
    DialOk {
        generation: u64,
        stream: TcpStream,
    },
    DialFailed {
        generation: u64,
        error: std::io::Error,
    },
    Message {
        generation: u64,
        command: IscpCommand,
    },
    Closed {
        generation: u64,
    },
}

/// Handle to a running session engine.
#[derive(Clone)]
pub(crate) struct SessionHandle {
    connect_tx: mpsc::Sender<ConnectReply>,
    disconnect_tx: mpsc::Sender<()>,
    send_tx: mpsc::Sender<SendTask>,
    shutdown_tx: mpsc::Sender<()>,
    state_rx: watch::Receiver<ConnectionState>,
    task: Arc<parking_lot::Mutex<Option<JoinHandle<()>>>>,
}

impl SessionHandle {
    /// Spawn the engine and its dispatcher tasks.
    pub fn spawn(config: SessionConfig) -> Self {
        let (connect_tx, connect_rx) = mpsc::channel(8);
        let (disconnect_tx, disconnect_rx) = mpsc::channel(8);
        let (send_tx, send_rx) = mpsc::channel(32);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (events_tx, events_rx) = mpsc::channel(32);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        // Inbound commands are delivered from a dedicated task so slow
        // handlers do not stall the engine's writer.
        let (dispatch_tx, mut dispatch_rx) = mpsc::channel::<IscpCommand>(64);
        let on_message = config.on_message;
        tokio::spawn(async move {
            while let Some(command) = dispatch_rx.recv().await {
                on_message(command);
            }
        });

        // State callbacks run outside the writer but in transition order.
        let (state_cb_tx, mut state_cb_rx) = mpsc::unbounded_channel::<ConnectionState>();
        let on_state = config.on_state;
        tokio::spawn(async move {
            while let Some(state) = state_cb_rx.recv().await {
                on_state(state);
            }
        });

        let engine = Engine {
            host: config.host,
            port: config.port,
            connect_timeout: config.connect_timeout,
            reconnect_delay: config.reconnect_delay,
            allow_reconnect: config.allow_reconnect,
            state: ConnectionState::Disconnected,
            state_tx,
            state_cb_tx,
            writer: None,
            reader: None,
            generation: 0,
            reconnecting: false,
            reconnect_at: None,
            connect_waiters: Vec::new(),
            events_tx,
            dispatch_tx,
        };

        let task = tokio::spawn(engine.run(
            connect_rx,
            disconnect_rx,
            send_rx,
            shutdown_rx,
            events_rx,
        ));

        Self {
            connect_tx,
            disconnect_tx,
            send_tx,
            shutdown_tx,
            state_rx,
            task: Arc::new(parking_lot::Mutex::new(Some(task))),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Request a connect without waiting for the outcome.
    pub async fn connect(&self) -> Result<()> {
        self.connect_tx
            .send(None)
            .await
            .map_err(|_| ClientError::Closed)
    }

    /// Request a connect and wait up to `timeout` for the dial outcome.
    pub async fn connect_wait(&self, timeout: Duration) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.connect_tx
            .send(Some(reply_tx))
            .await
            .map_err(|_| ClientError::Closed)?;
        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::Closed),
            Err(_) => Err(ClientError::Timeout),
        }
    }

    /// Request a disconnect.
    pub async fn disconnect(&self) -> Result<()> {
        self.disconnect_tx
            .send(())
            .await
            .map_err(|_| ClientError::Closed)
    }

    /// Enqueue a command; with a non-zero timeout, wait for the write to
    /// complete. After a `Timeout` the command may still be sent.
    pub async fn send(&self, command: IscpCommand, timeout: Duration) -> Result<()> {
        if matches!(
            self.state(),
            ConnectionState::Disconnected | ConnectionState::Disconnecting
        ) {
            return Err(ClientError::NotConnected);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.send_tx
            .send(SendTask {
                command,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ClientError::Closed)?;

        if timeout.is_zero() {
            return Ok(());
        }
        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::Closed),
            Err(_) => Err(ClientError::Timeout),
        }
    }

    /// Shut the engine down and wait for it to drain.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(()).await;
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

struct Engine {
    host: String,
    port: u16,
    connect_timeout: Duration,
    reconnect_delay: Duration,
    allow_reconnect: bool,
    state: ConnectionState,
    state_tx: watch::Sender<ConnectionState>,
    state_cb_tx: mpsc::UnboundedSender<ConnectionState>,
    writer: Option<OwnedWriteHalf>,
    reader: Option<JoinHandle<()>>,
    /// Bumped on every new dial and teardown; stale events are ignored.
    generation: u64,
    /// The current dial originated from the reconnect timer.
    reconnecting: bool,
    reconnect_at: Option<Instant>,
    connect_waiters: Vec<oneshot::Sender<Result<()>>>,
    events_tx: mpsc::Sender<Event>,
    dispatch_tx: mpsc::Sender<IscpCommand>,
}

impl Engine {
    async fn run(
        mut self,
        mut connect_rx: mpsc::Receiver<ConnectReply>,
        mut disconnect_rx: mpsc::Receiver<()>,
        mut send_rx: mpsc::Receiver<SendTask>,
        mut shutdown_rx: mpsc::Receiver<()>,
        mut events_rx: mpsc::Receiver<Event>,
    ) {
        loop {
            let reconnect_at = self.reconnect_at;
            tokio::select! {
                // also fires when the handle is dropped without stop()
                _ = shutdown_rx.recv() => {
                    debug!("session shutdown");
                    self.do_disconnect();
                    break;
                }
                Some(reply) = connect_rx.recv() => {
                    self.do_connect(reply, false);
                }
                Some(()) = disconnect_rx.recv() => {
                    self.do_disconnect();
                }
                Some(task) = send_rx.recv() => {
                    self.do_send(task).await;
                }
                Some(event) = events_rx.recv() => {
                    self.handle_event(event).await;
                }
                _ = sleep_until(reconnect_at), if reconnect_at.is_some() => {
                    self.reconnect_at = None;
                    debug!("reconnect timer fired");
                    self.do_connect(None, true);
                }
            }
        }
    }

    fn do_connect(&mut self, reply: ConnectReply, reconnecting: bool) {
        match self.state {
            ConnectionState::Connected => {
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(()));
                }
                return;
            }
            ConnectionState::Connecting => {
                if let Some(reply) = reply {
                    self.connect_waiters.push(reply);
                }
                return;
            }
            _ => {}
        }

        self.reconnect_at = None;
        self.reconnecting = reconnecting;
        if let Some(reply) = reply {
            self.connect_waiters.push(reply);
        }

        self.generation += 1;
        let generation = self.generation;
        self.change_state(ConnectionState::Connecting);

        let host = self.host.clone();
        let port = self.port;
        let timeout = self.connect_timeout;
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            debug!("dial {host}:{port}");
            let dialed =
                tokio::time::timeout(timeout, TcpStream::connect((host.as_str(), port))).await;
            let event = match dialed {
                Ok(Ok(stream)) => Event::DialOk { generation, stream },
                Ok(Err(error)) => Event::DialFailed { generation, error },
                Err(_) => Event::DialFailed {
                    generation,
                    error: std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "connect timed out",
                    ),
                },
            };
            let _ = events.send(event).await;
        });
    }

    fn do_disconnect(&mut self) {
        self.reconnect_at = None;
        self.reconnecting = false;

        match self.state {
            ConnectionState::Disconnected | ConnectionState::Disconnecting => {}
            ConnectionState::Connecting => {
                // abandon the pending dial; its result is ignored
                self.generation += 1;
                self.change_state(ConnectionState::Disconnected);
                self.notify_connect_waiters(Err("cancelled".to_string()));
            }
            ConnectionState::Connected => {
                debug!("disconnect");
                self.change_state(ConnectionState::Disconnecting);
                self.generation += 1;
                self.teardown();
                self.change_state(ConnectionState::Disconnected);
            }
        }
    }

    async fn do_send(&mut self, task: SendTask) {
        if self.state != ConnectionState::Connected {
            warn!("discarding {} (not connected)", task.command);
            let _ = task.reply.send(Err(ClientError::NotConnected));
            return;
        }
        let Some(writer) = self.writer.as_mut() else {
            let _ = task.reply.send(Err(ClientError::NotConnected));
            return;
        };

        let data = frame::encode(&task.command);
        debug!("send {}", task.command);
        let written = writer.write_all(&data).await;
        if let Err(error) = &written {
            // the read task's EOF is the authoritative disconnect signal
            error!("write failed: {error}");
        }
        let _ = task.reply.send(written.map_err(ClientError::Io));
    }

    async fn handle_event(&mut self, event: Event) {
        match event {
            Event::DialOk { generation, stream } => {
                if generation != self.generation || self.state != ConnectionState::Connecting {
                    // superseded dial; the receiver serves one client only,
                    // so close the extra socket right away
                    drop(stream);
                    return;
                }
                info!("connected to {}:{}", self.host, self.port);
                let (read_half, write_half) = stream.into_split();
                self.writer = Some(write_half);
                self.reader = Some(self.spawn_reader(read_half, generation));
                self.reconnecting = false;
                self.change_state(ConnectionState::Connected);
                self.notify_connect_waiters(Ok(()));
            }
            Event::DialFailed { generation, error } => {
                if generation != self.generation || self.state != ConnectionState::Connecting {
                    return;
                }
                warn!("connect to {}:{} failed: {error}", self.host, self.port);
                self.change_state(ConnectionState::Disconnected);
                self.notify_connect_waiters(Err(error.to_string()));
                if self.reconnecting && self.allow_reconnect {
                    self.arm_reconnect();
                }
            }
            Event::Message {
                generation,
                command,
            } => {
                if generation != self.generation {
                    return;
                }
                let _ = self.dispatch_tx.send(command).await;
            }
            Event::Closed { generation } => {
                if generation != self.generation || self.state != ConnectionState::Connected {
                    return;
                }
                error!("connection closed by remote device");
                self.generation += 1;
                self.teardown();
                self.change_state(ConnectionState::Disconnected);
                if self.allow_reconnect {
                    self.arm_reconnect();
                }
            }
        }
    }

    fn spawn_reader(&self, read_half: OwnedReadHalf, generation: u64) -> JoinHandle<()> {
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let mut reader = BufReader::new(read_half);
            let mut header = [0u8; HEADER_SIZE];
            loop {
                if let Err(error) = reader.read_exact(&mut header).await {
                    if error.kind() != std::io::ErrorKind::UnexpectedEof {
                        warn!("read failed: {error}");
                    }
                    break;
                }
                let payload_size = match frame::decode_header(&header) {
                    Ok((_, payload_size)) => payload_size,
                    Err(error) => {
                        warn!("discarding bad header: {error}");
                        continue;
                    }
                };
                if payload_size > MAX_PAYLOAD {
                    warn!("payload of {payload_size} bytes exceeds limit, closing");
                    break;
                }

                let mut payload = vec![0u8; payload_size];
                if let Err(error) = reader.read_exact(&mut payload).await {
                    if error.kind() != std::io::ErrorKind::UnexpectedEof {
                        warn!("read failed: {error}");
                    }
                    break;
                }

                match frame::decode_payload(&payload) {
                    Ok(command) => {
                        debug!("recv {command}");
                        if events
                            .send(Event::Message {
                                generation,
                                command,
                            })
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    Err(error) => warn!("discarding bad payload: {error}"),
                }
            }
            let _ = events.send(Event::Closed { generation }).await;
        })
    }

    fn teardown(&mut self) {
        self.writer = None;
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }

    fn arm_reconnect(&mut self) {
        info!("reconnect in {:?}", self.reconnect_delay);
        self.reconnect_at = Some(Instant::now() + self.reconnect_delay);
    }

    fn change_state(&mut self, state: ConnectionState) {
        debug!("state {} -> {}", self.state, state);
        self.state = state;
        let _ = self.state_tx.send(state);
        let _ = self.state_cb_tx.send(state);
    }

    fn notify_connect_waiters(&mut self, result: std::result::Result<(), String>) {
        for waiter in self.connect_waiters.drain(..) {
            let reply = match &result {
                Ok(()) => Ok(()),
                Err(message) => Err(ClientError::ConnectionFailed(message.clone())),
            };
            let _ = waiter.send(reply);
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
