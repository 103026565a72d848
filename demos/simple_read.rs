//! Example: Reading and decoding a data block
//!
//! Run with: cargo run --example simple_read -- 192.168.0.1 0 2
//!
//! This example demonstrates:
//! - Connecting to a PLC by rack and slot
//! - Reading a data block into a buffer
//! - Checking the device return code
//! - Decoding typed values at payload offsets
//!
//! Set `RUST_LOG=siemens_s7=trace` to see the frames on the wire.

use siemens_s7::{Client, ClientConfig, ReadResponse};
use std::net::Ipv4Addr;
use tracing_subscriber::EnvFilter;

fn main() -> siemens_s7::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let ip: Ipv4Addr = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(Ipv4Addr::new(192, 168, 0, 1));
    let rack: u16 = args.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    let slot: u16 = args.next().and_then(|s| s.parse().ok()).unwrap_or(2);

    // =========================================================================
    // Connect to PLC
    // =========================================================================

    let mut client = Client::new(ClientConfig::new(ip, rack, slot))?;
    client.connect()?;
    println!("Connected to {} (PDU {:?})", ip, client.pdu_length());

    // =========================================================================
    // Read DB1, bytes 0-31
    // =========================================================================

    let mut buffer = [0u8; 512];
    let n = client.read(&mut buffer, 1, 0, 32)?;
    let response = ReadResponse::parse(&buffer[..n])?;
    println!("Received {} payload bytes: {:02X?}", response.payload().len(), response.payload());

    // =========================================================================
    // Typed values
    // =========================================================================

    let status: u16 = response.get(0)?;
    let counter: i32 = response.get(2)?;
    let temperature: f32 = response.get(6)?;
    let total: f64 = response.get(10)?;
    let pump_running = response.get_bool(18, 0)?;
    let alarm = response.get_bool(18, 1)?;
    let tag = response.get_string(19, 8)?;

    println!("DB1.DBW0  status      = 0x{:04X}", status);
    println!("DB1.DBD2  counter     = {}", counter);
    println!("DB1.DBD6  temperature = {:.2}", temperature);
    println!("DB1.DBD10 total       = {:.3}", total);
    println!("DB1.DBX18.0 pump      = {}", pump_running);
    println!("DB1.DBX18.1 alarm     = {}", alarm);
    println!("DB1.DBB20 tag         = {:?}", tag);

    client.close()
}
