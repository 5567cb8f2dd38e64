use breathline::config::EngineConfig;
use breathline::error::{FailureCause, SyncError};
use breathline::kernel::mutation::MutationRequest;
use breathline::kernel::segment::{DbId, PhaseType, SegmentId};
use breathline::services::api::{HttpTimelineApi, TimelineApi};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Reads one request: headers, then as much body as Content-Length announces.
async fn read_request(stream: &mut TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = stream.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&raw);
        if let Some(split) = text.find("\r\n\r\n") {
            let body_len = text[..split]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if raw.len() >= split + 4 + body_len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&raw).into_owned()
}

/// Serves a single canned answer and hands back the request it received.
async fn serve_once(status: &'static str, body: &'static str) -> (SocketAddr, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
        request
    });
    (addr, handle)
}

fn client_for(addr: SocketAddr) -> HttpTimelineApi {
    HttpTimelineApi::new(EngineConfig {
        base_url: format!("http://{}", addr),
        ..Default::default()
    })
}

fn delete_request() -> MutationRequest {
    MutationRequest::Delete { db_id: DbId(3), segment_ids: vec![SegmentId(9)] }
}

#[tokio::test]
async fn test_error_body_is_passed_through_verbatim() {
    let (addr, server) = serve_once("400 Bad Request", r#"{"error":"Segment 9 not found"}"#).await;

    let err = client_for(addr).mutate(&delete_request()).await.unwrap_err();
    assert_eq!(err, SyncError::Server("Segment 9 not found".to_string()));
    assert_eq!(err.user_message(), "Segment 9 not found");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /delete_segments "), "Unexpected request line: {}", request);
    assert!(request.contains(r#""segment_ids":[9]"#), "Body missing ids: {}", request);

    println!("Error body Passed");
}

#[tokio::test]
async fn test_status_without_error_body_maps_to_status() {
    let (addr, _server) = serve_once("500 Internal Server Error", "<html>upstream exploded</html>").await;

    let err = client_for(addr).mutate(&delete_request()).await.unwrap_err();
    assert_eq!(err, SyncError::Status(500));
    assert_eq!(err.cause(), FailureCause::Server);

    println!("Bare status Passed");
}

#[tokio::test]
async fn test_success_body_becomes_payload() {
    let body = r#"{"success":true,"events":[{"id":1,"start":0,"end":10,"type":"inhalation"}]}"#;
    let (addr, _server) = serve_once("200 OK", body).await;

    let payload = client_for(addr).mutate(&delete_request()).await.unwrap();
    assert_eq!(payload.events.len(), 1);
    assert_eq!(payload.events[0].phase, PhaseType::Inhalation);
}

#[tokio::test]
async fn test_undo_check_reads_availability() {
    let (addr, server) = serve_once("200 OK", r#"{"undo_available":true}"#).await;

    assert_eq!(client_for(addr).undo_available(DbId(3)).await, Ok(true));

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /undo "), "Unexpected request line: {}", request);
    assert!(request.contains(r#""check":true"#));
}

#[tokio::test]
async fn test_silent_server_times_out_with_configured_bound() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        read_request(&mut stream).await;
        // Hold the connection open without answering
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(stream);
    });

    let api = HttpTimelineApi::new(EngineConfig {
        base_url: format!("http://{}", addr),
        request_timeout_ms: 100,
        ..Default::default()
    });

    let err = api.mutate(&delete_request()).await.unwrap_err();
    assert_eq!(err, SyncError::Timeout(100), "Expected the configured bound, got {:?}", err);
    assert_eq!(err.cause(), FailureCause::Timeout);

    println!("HTTP timeout Passed");
}
