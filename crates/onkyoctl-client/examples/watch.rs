//! Watch status messages from a receiver.
//!
//! Usage: `cargo run --example watch -- <host>`

use onkyoctl_client::{Device, DeviceConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let host = std::env::args().nth(1).ok_or("usage: watch <host>")?;

    let device = Device::new(DeviceConfig::new(host).allow_reconnect(true))?;
    device.on_message(|name, value| println!("{name}: {value}"));
    device.on_connected(|| println!("(connected)"));
    device.on_disconnected(|| println!("(disconnected)"));

    device.start().await?;
    device.query("power").await?;

    tokio::signal::ctrl_c().await?;
    device.stop().await;
    Ok(())
}
