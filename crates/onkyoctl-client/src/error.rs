//! Client error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// A send was issued before `start()` or after `stop()`
    #[error("device not started")]
    NotStarted,

    /// A send was issued while the session is not connected
    #[error("not connected")]
    NotConnected,

    /// Dialing the receiver failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A bounded wait elapsed; the command may still be sent
    #[error("timeout")]
    Timeout,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] onkyoctl_core::Error),

    /// The session engine is gone
    #[error("session closed")]
    Closed,
}
