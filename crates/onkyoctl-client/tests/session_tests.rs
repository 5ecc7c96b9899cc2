//! Integration tests for the session engine and device facade,
//! exercised against a fake receiver.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use onkyoctl_client::{ClientError, ConnectionState, Device, DeviceConfig};
use onkyoctl_core::IscpCommand;
use onkyoctl_test_utils::{free_port, wait_for, FakeReceiver, DEFAULT_TIMEOUT};

fn test_config(receiver: &FakeReceiver) -> DeviceConfig {
    DeviceConfig::new(receiver.host())
        .port(receiver.port())
        .connect_timeout(Duration::from_secs(2))
}

#[tokio::test]
async fn send_reaches_the_receiver() {
    let receiver = FakeReceiver::start().await;
    let device = Device::new(test_config(&receiver)).unwrap();
    device.start().await.unwrap();

    device.send_friendly("power", "on").await.unwrap();

    assert!(receiver.wait_for_commands(1, DEFAULT_TIMEOUT).await);
    assert_eq!(receiver.received(), vec![IscpCommand::from("PWR01")]);

    device.stop().await;
}

#[tokio::test]
async fn sends_arrive_in_order() {
    let receiver = FakeReceiver::start().await;
    let device = Device::new(test_config(&receiver)).unwrap();
    device.start().await.unwrap();

    device.send_friendly("power", "on").await.unwrap();
    device.send_friendly("mute", "toggle").await.unwrap();
    device.send_friendly("volume", 23).await.unwrap();
    device.query("input").await.unwrap();

    assert!(receiver.wait_for_commands(4, DEFAULT_TIMEOUT).await);
    assert_eq!(
        receiver.received(),
        vec![
            IscpCommand::from("PWR01"),
            IscpCommand::from("AMTTG"),
            IscpCommand::from("MVL2E"),
            IscpCommand::from("SLIQSTN"),
        ]
    );

    device.stop().await;
}

#[tokio::test]
async fn inbound_messages_reach_the_callback_in_order() {
    let receiver = FakeReceiver::start().await;
    let device = Device::new(test_config(&receiver)).unwrap();

    let messages: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let messages = messages.clone();
        device.on_message(move |name, value| {
            messages.lock().push((name.to_string(), value.to_string()));
        });
    }

    device.start().await.unwrap();

    receiver.push(IscpCommand::from("PWR01")).await;
    receiver.push(IscpCommand::from("MVL2E")).await;
    receiver.push(IscpCommand::from("AMTTG")).await;

    assert!(wait_for(|| messages.lock().len() >= 3, DEFAULT_TIMEOUT).await);
    assert_eq!(
        messages.lock().clone(),
        vec![
            ("power".to_string(), "on".to_string()),
            ("volume".to_string(), "23".to_string()),
            ("mute".to_string(), "toggle".to_string()),
        ]
    );

    device.stop().await;
}

#[tokio::test]
async fn unknown_inbound_commands_are_skipped() {
    let receiver = FakeReceiver::start().await;
    let device = Device::new(test_config(&receiver)).unwrap();

    let messages: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let messages = messages.clone();
        device.on_message(move |name, value| {
            messages.lock().push((name.to_string(), value.to_string()));
        });
    }

    device.start().await.unwrap();

    // unknown group, then a bad parameter, then a good message
    receiver.push(IscpCommand::from("ZZZ01")).await;
    receiver.push(IscpCommand::from("PWRxx")).await;
    receiver.push(IscpCommand::from("PWR00")).await;

    assert!(wait_for(|| !messages.lock().is_empty(), DEFAULT_TIMEOUT).await);
    assert_eq!(
        messages.lock().clone(),
        vec![("power".to_string(), "off".to_string())]
    );

    device.stop().await;
}

#[tokio::test]
async fn send_without_start_fails() {
    let device = Device::new(DeviceConfig::new("127.0.0.1").port(free_port())).unwrap();
    let error = device.send_friendly("power", "on").await.unwrap_err();
    assert!(matches!(error, ClientError::NotStarted));
}

#[tokio::test]
async fn send_after_stop_fails() {
    let receiver = FakeReceiver::start().await;
    let device = Device::new(test_config(&receiver)).unwrap();
    device.start().await.unwrap();
    device.stop().await;

    let error = device.send_friendly("power", "on").await.unwrap_err();
    assert!(matches!(error, ClientError::NotStarted));
}

#[tokio::test]
async fn start_fails_when_nothing_listens() {
    let config = DeviceConfig::new("127.0.0.1")
        .port(free_port())
        .connect_timeout(Duration::from_secs(1));
    let device = Device::new(config).unwrap();
    assert!(device.start().await.is_err());
}

#[tokio::test]
async fn send_while_disconnected_fails() {
    let receiver = FakeReceiver::start().await;
    let device = Device::new(test_config(&receiver)).unwrap();
    device.start().await.unwrap();

    receiver.close_connection().await;
    assert!(
        wait_for(
            || device.state() == ConnectionState::Disconnected,
            DEFAULT_TIMEOUT
        )
        .await
    );

    let error = device.send_friendly("power", "on").await.unwrap_err();
    assert!(matches!(error, ClientError::NotConnected));

    device.stop().await;
}

#[tokio::test]
async fn invalid_commands_fail_without_touching_the_wire() {
    let receiver = FakeReceiver::start().await;
    let device = Device::new(test_config(&receiver)).unwrap();
    device.start().await.unwrap();

    assert!(device.send_friendly("power", "sideways").await.is_err());
    assert!(device.send_friendly("no-such-name", "on").await.is_err());
    assert!(device.query("no-such-name").await.is_err());

    device.send_friendly("power", "off").await.unwrap();
    assert!(receiver.wait_for_commands(1, DEFAULT_TIMEOUT).await);
    assert_eq!(receiver.received(), vec![IscpCommand::from("PWR00")]);

    device.stop().await;
}

#[tokio::test]
async fn reconnects_after_server_close() {
    let receiver = FakeReceiver::start().await;
    let config = test_config(&receiver)
        .allow_reconnect(true)
        .reconnect_delay(Duration::from_secs(1));
    let device = Device::new(config).unwrap();

    let connects = Arc::new(AtomicU32::new(0));
    let disconnects = Arc::new(AtomicU32::new(0));
    {
        let connects = connects.clone();
        device.on_connected(move || {
            connects.fetch_add(1, Ordering::SeqCst);
        });
        let disconnects = disconnects.clone();
        device.on_disconnected(move || {
            disconnects.fetch_add(1, Ordering::SeqCst);
        });
    }

    device.start().await.unwrap();
    assert!(receiver.wait_for_connections(1, DEFAULT_TIMEOUT).await);
    assert!(wait_for(|| connects.load(Ordering::SeqCst) >= 1, DEFAULT_TIMEOUT).await);

    receiver.close_connection().await;
    assert!(wait_for(|| disconnects.load(Ordering::SeqCst) >= 1, DEFAULT_TIMEOUT).await);

    // a new connection appears after roughly reconnect_delay
    assert!(receiver.wait_for_connections(2, Duration::from_secs(3)).await);
    assert!(
        wait_for(
            || device.state() == ConnectionState::Connected,
            DEFAULT_TIMEOUT
        )
        .await
    );

    device.send_friendly("power", "on").await.unwrap();
    assert!(receiver.wait_for_commands(1, DEFAULT_TIMEOUT).await);
    assert_eq!(receiver.received(), vec![IscpCommand::from("PWR01")]);

    device.stop().await;
}

#[tokio::test]
async fn auto_connect_redials_on_send() {
    let receiver = FakeReceiver::start().await;
    let config = test_config(&receiver)
        .auto_connect(true)
        .send_timeout(Duration::from_secs(2));
    let device = Device::new(config).unwrap();
    device.start().await.unwrap();

    receiver.close_connection().await;
    assert!(
        wait_for(
            || device.state() == ConnectionState::Disconnected,
            DEFAULT_TIMEOUT
        )
        .await
    );

    device.send_friendly("power", "on").await.unwrap();

    assert!(receiver.wait_for_connections(2, DEFAULT_TIMEOUT).await);
    assert!(receiver.wait_for_commands(1, DEFAULT_TIMEOUT).await);
    assert_eq!(receiver.received(), vec![IscpCommand::from("PWR01")]);

    device.stop().await;
}

#[tokio::test]
async fn zero_timeout_send_is_enqueue_only() {
    let receiver = FakeReceiver::start().await;
    let device = Device::new(test_config(&receiver)).unwrap();
    device.start().await.unwrap();

    device
        .send_raw(IscpCommand::from("PWR01"), Duration::ZERO)
        .await
        .unwrap();

    assert!(receiver.wait_for_commands(1, DEFAULT_TIMEOUT).await);

    device.stop().await;
}

#[tokio::test]
async fn start_twice_is_a_noop() {
    let receiver = FakeReceiver::start().await;
    let device = Device::new(test_config(&receiver)).unwrap();
    device.start().await.unwrap();
    device.start().await.unwrap();
    assert!(receiver.wait_for_connections(1, DEFAULT_TIMEOUT).await);
    assert_eq!(receiver.connections(), 1);
    device.stop().await;
}
