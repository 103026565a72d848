//! Example: Connection lifecycle and error handling
//!
//! Run with: cargo run --example connection_lifecycle -- 192.168.0.1
//!
//! This example demonstrates:
//! - Custom timeouts and per-call deadlines
//! - Telling handshake failures apart by error kind
//! - Reconnecting after a transport error

use siemens_s7::{payload, Client, ClientConfig, ErrorKind, S7Error};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

fn main() -> siemens_s7::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let ip: Ipv4Addr = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(Ipv4Addr::new(192, 168, 0, 1));

    let config = ClientConfig::new(ip, 0, 2).with_timeout(Duration::from_millis(500));
    let mut client = Client::new(config)?;
    println!("State: {}", client.state());

    match client.connect() {
        Ok(()) => println!("State: {}", client.state()),
        Err(e) if e.is_timeout() => {
            println!("PLC at {} did not answer within 500 ms", ip);
            return Ok(());
        }
        Err(S7Error::UpgradeRejected { code }) => {
            println!("Connection refused for rack 0 / slot 2 (PDU type 0x{:02X})", code);
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    let mut buffer = [0u8; 512];
    for attempt in 1..=3 {
        client.set_deadline(Instant::now() + Duration::from_millis(200))?;

        let result = client
            .read(&mut buffer, 1, 0, 4)
            .and_then(|n| {
                payload::check_read_response(&buffer[..n])?;
                payload::get_u32(&buffer[..n], 0)
            });

        match result {
            Ok(value) => println!("Attempt {}: DB1.DBD0 = {}", attempt, value),
            Err(e) if e.kind() == ErrorKind::ReadRejected => {
                println!("Attempt {}: PLC rejected the read: {}", attempt, e);
            }
            Err(e) if e.kind() == ErrorKind::Transport => {
                println!("Attempt {}: transport error ({}), reconnecting", attempt, e);
                client.connect()?;
            }
            Err(e) => return Err(e),
        }
    }

    client.close()?;
    println!("State: {}", client.state());

    // Operations after close report NotConnected
    if let Err(e) = client.close() {
        println!("Second close: {}", e);
    }

    Ok(())
}
