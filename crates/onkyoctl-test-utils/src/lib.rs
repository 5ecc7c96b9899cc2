//! Test helpers for onkyoctl
//!
//! Provides a fake eISCP receiver speaking the real wire format plus
//! condition-based wait helpers, so integration tests never assert on
//! hardcoded sleeps.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use onkyoctl_core::{frame, IscpCommand, HEADER_SIZE};

/// Default timeout for test waits.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll a condition until it holds or `max_wait` elapses.
pub async fn wait_for<F>(mut check: F, max_wait: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Reserve an ephemeral port that nothing is listening on.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("local addr").port()
}

enum ServerOp {
    Push(IscpCommand),
    CloseConnection,
}

/// A fake eISCP receiver.
///
/// Accepts one client at a time (like the real device), records every
/// decoded inbound command, and can push frames to the connected client
/// or drop the connection. The accept loop is aborted on drop.
pub struct FakeReceiver {
    port: u16,
    received: Arc<Mutex<Vec<IscpCommand>>>,
    accepted: Arc<AtomicU32>,
    ops: mpsc::Sender<ServerOp>,
    task: JoinHandle<()>,
}

impl FakeReceiver {
    /// Bind an ephemeral port and start accepting.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake receiver");
        let port = listener.local_addr().expect("local addr").port();

        let received = Arc::new(Mutex::new(Vec::new()));
        let accepted = Arc::new(AtomicU32::new(0));
        let (ops_tx, ops_rx) = mpsc::channel(16);

        let task = tokio::spawn(serve(
            listener,
            received.clone(),
            accepted.clone(),
            ops_rx,
        ));

        Self {
            port,
            received,
            accepted,
            ops: ops_tx,
            task,
        }
    }

    pub fn host(&self) -> &'static str {
        "127.0.0.1"
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Commands received so far, in arrival order.
    pub fn received(&self) -> Vec<IscpCommand> {
        self.received.lock().clone()
    }

    /// Number of connections accepted so far.
    pub fn connections(&self) -> u32 {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Send a frame to the connected client.
    pub async fn push(&self, command: IscpCommand) {
        self.ops
            .send(ServerOp::Push(command))
            .await
            .expect("fake receiver gone");
    }

    /// Drop the current connection; the client sees EOF.
    pub async fn close_connection(&self) {
        self.ops
            .send(ServerOp::CloseConnection)
            .await
            .expect("fake receiver gone");
    }

    /// Wait until at least `count` commands have been received.
    pub async fn wait_for_commands(&self, count: usize, max_wait: Duration) -> bool {
        let received = self.received.clone();
        wait_for(move || received.lock().len() >= count, max_wait).await
    }

    /// Wait until at least `count` connections have been accepted.
    pub async fn wait_for_connections(&self, count: u32, max_wait: Duration) -> bool {
        let accepted = self.accepted.clone();
        wait_for(move || accepted.load(Ordering::SeqCst) >= count, max_wait).await
    }
}

impl Drop for FakeReceiver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    listener: TcpListener,
    received: Arc<Mutex<Vec<IscpCommand>>>,
    accepted: Arc<AtomicU32>,
    mut ops: mpsc::Receiver<ServerOp>,
) {
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        accepted.fetch_add(1, Ordering::SeqCst);
        handle_client(stream, &received, &mut ops).await;
    }
}

async fn handle_client(
    stream: TcpStream,
    received: &Arc<Mutex<Vec<IscpCommand>>>,
    ops: &mut mpsc::Receiver<ServerOp>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let received = received.clone();
    let mut reader = tokio::spawn(read_frames(read_half, received));

    loop {
        tokio::select! {
            _ = &mut reader => return,
            op = ops.recv() => match op {
                Some(ServerOp::Push(command)) => {
                    let data = frame::encode(&command);
                    if write_half.write_all(&data).await.is_err() {
                        reader.abort();
                        return;
                    }
                }
                Some(ServerOp::CloseConnection) | None => {
                    reader.abort();
                    return;
                }
            },
        }
    }
}

async fn read_frames(read_half: OwnedReadHalf, received: Arc<Mutex<Vec<IscpCommand>>>) {
    let mut reader = BufReader::new(read_half);
    let mut header = [0u8; HEADER_SIZE];
    loop {
        if reader.read_exact(&mut header).await.is_err() {
            return;
        }
        let Ok((_, payload_size)) = frame::decode_header(&header) else {
            return;
        };
        let mut payload = vec![0u8; payload_size];
        if reader.read_exact(&mut payload).await.is_err() {
            return;
        }
        if let Ok(command) = frame::decode_payload(&payload) {
            received.lock().push(command);
        }
    }
}
