use serde::Deserialize;
use std::time::Duration;
use sensorhub_realtime_rs::{
    ConnectionState, TelemetryClient, TelemetryClientOptions, decode_frame,
};

/// What this demo expects inside each frame; the hub may send more
#[derive(Debug, Deserialize)]
struct Reading {
    hz: f64,
}

/// Streams readings from a sensor hub and survives link drops
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let url = std::env::var("SENSORHUB_URL").unwrap_or_else(|_| "ws://192.168.4.1:81/stream".to_string());
    println!("📡 Streaming from: {}\n", url);

    let client = TelemetryClient::new(&url, TelemetryClientOptions::default())?;

    client.on_state(|state| match state {
        ConnectionState::Open => println!("🟢 {state}"),
        ConnectionState::Connecting => println!("🟡 {state}"),
        ConnectionState::Closing | ConnectionState::Closed => println!("🔴 {state}"),
    });
    client.on_message(|text| match decode_frame::<Reading>(text) {
        Ok(reading) => println!("📈 {:.2} Hz", reading.hz),
        Err(e) => println!("⚠️  skipped frame: {e}"),
    });
    client.on_exhausted(|attempts| {
        println!("⛔ Hub unreachable after {attempts} attempts, call connect() to retry");
    });

    // Queued until the socket opens.
    client.send(r#"{"cmd":"start"}"#);
    client.connect();

    println!("⏳ Streaming for 60 seconds (interrupt the Wi-Fi link to watch it recover)...\n");
    tokio::time::sleep(Duration::from_secs(60)).await;

    client.close();
    println!("\n✅ Closed; {} messages were still queued", client.queued_len());

    Ok(())
}
