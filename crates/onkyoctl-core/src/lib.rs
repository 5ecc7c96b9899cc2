//! onkyoctl core
//!
//! Protocol types and codecs for controlling Onkyo A/V receivers over
//! eISCP (the Integra Serial Control Protocol framed over TCP).
//!
//! This crate provides:
//! - The friendly command model ([`Command`], [`FriendlyValue`], [`ParamKind`])
//! - The parameter codec mapping friendly values to raw payload tokens
//! - The command registry ([`CommandSet`]) translating in both directions
//! - Binary frame encoding/decoding ([`frame`])
//!
//! Everything here is pure: no I/O, no shared state. The session engine
//! and device facade live in `onkyoctl-client`.

pub mod command;
pub mod error;
pub mod frame;
pub mod param;
pub mod registry;

pub use command::{Command, FriendlyValue, Group, IscpCommand, ParamKind};
pub use error::{Error, Result};
pub use registry::CommandSet;

/// Default eISCP TCP port.
pub const DEFAULT_PORT: u16 = 60128;

/// Size of the eISCP frame header in bytes.
pub const HEADER_SIZE: usize = 16;

/// eISCP protocol version byte.
pub const EISCP_VERSION: u8 = 0x01;

/// The universal query parameter, appended to a group to request the
/// current value.
pub const QUERY_PARAM: &str = "QSTN";
