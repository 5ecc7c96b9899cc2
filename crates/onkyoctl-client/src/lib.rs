//! onkyoctl client
//!
//! High-level async client for Onkyo eISCP receivers.
//!
//! # Example
//!
//! ```ignore
//! use onkyoctl_client::{Device, DeviceConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let device = Device::new(DeviceConfig::new("192.168.1.40"))?;
//!
//!     device.on_message(|name, value| {
//!         println!("{name}: {value}");
//!     });
//!
//!     device.start().await?;
//!     device.send_friendly("power", "on").await?;
//!     device.query("volume").await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     device.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! The receiver accepts a single TCP client at a time and may drop the
//! connection when another controller connects; enable `allow_reconnect`
//! to transparently re-establish the session.

pub mod config;
pub mod device;
pub mod error;
pub mod session;

pub use config::DeviceConfig;
pub use device::Device;
pub use error::{ClientError, Result};
pub use session::ConnectionState;

pub use onkyoctl_core::{CommandSet, FriendlyValue, IscpCommand};
