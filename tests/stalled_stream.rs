//! Downloads from a server that trickles its body must stop at the cap

use network_speed_tester::{
    client::{PrimaryClient, SecondaryClient, ThroughputStrategy, TransferTimeouts},
    logging::Logger,
};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serves HTTP 200 with a large declared length, then one byte per `interval`
async fn spawn_trickle_server(interval: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                if socket.read(&mut request).await.is_err() {
                    return;
                }
                let headers = "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: 1000000\r\n\r\n";
                if socket.write_all(headers.as_bytes()).await.is_err() {
                    return;
                }
                loop {
                    if socket.write_all(b"x").await.is_err() || socket.flush().await.is_err() {
                        return;
                    }
                    tokio::time::sleep(interval).await;
                }
            });
        }
    });

    format!("http://{}/trickle", addr)
}

fn timeouts() -> TransferTimeouts {
    TransferTimeouts::new(Duration::from_secs(2), Duration::from_secs(5))
}

async fn assert_stops_at_cap(strategy: &dyn ThroughputStrategy, url: &str, cap: Duration) {
    let started = Instant::now();
    let result = strategy.download(url, cap, timeouts()).await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed < cap + Duration::from_millis(1500), "{} ran {:?}", strategy.name(), elapsed);
    assert!(result.bytes_transferred > 0);
    assert!(result.bytes_transferred < 1_000_000);
    assert!(result.megabits_per_second > 0.0);
    assert!(result.duration_seconds >= cap.as_secs_f64() - 0.1);
}

#[tokio::test]
async fn test_primary_download_stops_at_cap() {
    let url = spawn_trickle_server(Duration::from_millis(200)).await;
    let client = PrimaryClient::new(Logger::new("primary"));
    assert_stops_at_cap(&client, &url, Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_secondary_download_stops_at_cap() {
    let url = spawn_trickle_server(Duration::from_millis(200)).await;
    let client = SecondaryClient::new(Logger::new("secondary"));
    assert_stops_at_cap(&client, &url, Duration::from_secs(1)).await;
}

#[tokio::test]
async fn test_primary_download_stops_at_cap_one_byte_per_second() {
    let url = spawn_trickle_server(Duration::from_secs(1)).await;
    let client = PrimaryClient::new(Logger::new("primary"));
    assert_stops_at_cap(&client, &url, Duration::from_secs(2)).await;
}

#[tokio::test]
async fn test_secondary_download_stops_at_cap_one_byte_per_second() {
    let url = spawn_trickle_server(Duration::from_secs(1)).await;
    let client = SecondaryClient::new(Logger::new("secondary"));
    assert_stops_at_cap(&client, &url, Duration::from_secs(2)).await;
}
