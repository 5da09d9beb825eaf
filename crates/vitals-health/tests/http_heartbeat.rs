//! HTTP heartbeat tests against a local control endpoint.
//!
//! The endpoint is a bare `TcpListener` that answers every request with
//! a canned HTTP/1.1 response.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use vitals_core::{HeartbeatRequest, MetricKind, RegistrantInfo};
use vitals_health::{
    HealthCheckConfig, HealthChecker, HeartbeatClient, HeartbeatError, HttpHeartbeatClient,
    RetryPolicy, TerminationReason,
};
use vitals_metrics::{MetricsAggregator, Sample};

const STATS_BODY: &str = r#"{"stats":[{"service_id":"svc-a","ts":100,"cpu":0.5,"mem":0.2,"threads":4,"num_goroutines":10}]}"#;

struct Endpoint {
    address: String,
    requests: Arc<AtomicUsize>,
    last_request: Arc<tokio::sync::Mutex<String>>,
}

/// Serve `status` and `body` to every connection.
async fn serve(status: &'static str, body: &'static str) -> Endpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let requests = Arc::new(AtomicUsize::new(0));
    let last_request = Arc::new(tokio::sync::Mutex::new(String::new()));

    let counter = requests.clone();
    let last = last_request.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let request = read_request(&mut stream).await;
            *last.lock().await = request;

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    Endpoint {
        address,
        requests,
        last_request,
    }
}

/// Read one request: headers, then `content-length` bytes of body.
async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .filter_map(|l| l.split_once(':'))
                .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[tokio::test]
async fn heartbeat_posts_empty_request_and_decodes_stats() {
    let endpoint = serve("200 OK", STATS_BODY).await;
    let client = HttpHeartbeatClient::new(&endpoint.address).unwrap();

    let resp = client
        .heartbeat(&HeartbeatRequest::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resp.stats.len(), 1);
    assert_eq!(resp.stats[0].service_id, "svc-a");
    assert_eq!(resp.stats[0].concurrency_units, 10);

    let request = endpoint.last_request.lock().await.clone();
    assert!(request.starts_with("POST /heartbeat HTTP/1.1"), "got: {request}");
    assert!(request.ends_with("{}"), "got: {request}");
}

#[tokio::test]
async fn heartbeat_with_null_body_is_empty() {
    let endpoint = serve("200 OK", "null").await;
    let client = HttpHeartbeatClient::new(&endpoint.address).unwrap();

    let resp = client.heartbeat(&HeartbeatRequest::default()).await.unwrap();
    assert!(resp.is_none());
}

#[tokio::test]
async fn heartbeat_non_2xx_is_an_error() {
    let endpoint = serve("503 Service Unavailable", "").await;
    let client = HttpHeartbeatClient::new(&endpoint.address).unwrap();

    let result = client.heartbeat(&HeartbeatRequest::default()).await;
    assert!(matches!(result, Err(HeartbeatError::Status(503))));
}

#[tokio::test]
async fn checker_forwards_stats_from_live_endpoint() {
    let endpoint = serve("200 OK", STATS_BODY).await;
    let client = Arc::new(HttpHeartbeatClient::new(&endpoint.address).unwrap());
    let aggregator = MetricsAggregator::new(64);
    let (tx, mut reports) = tokio::sync::mpsc::channel(1);

    let config = HealthCheckConfig {
        interval: Duration::from_millis(50),
        max_heartbeat_retries: 3,
        retry: RetryPolicy::no_retry(),
        probe_timeout: Duration::from_secs(2),
    };
    let handle = HealthChecker::spawn(
        RegistrantInfo::new("svc-a", endpoint.address.clone()),
        client,
        Arc::new(aggregator.clone()),
        tx,
        config,
    );

    tokio::time::sleep(Duration::from_millis(180)).await;
    handle.stop().await.unwrap();

    let report = reports.recv().await.unwrap();
    assert_eq!(report.reason, TerminationReason::Stopped);

    let probes = endpoint.requests.load(Ordering::SeqCst);
    assert!(probes >= 1, "expected at least one probe, got {probes}");
    assert_eq!(aggregator.accepted(), 4 * probes as u64);
    assert_eq!(
        aggregator.series(MetricKind::Memory, "svc-a").await.last(),
        Some(&Sample { ts: 100, value: 0.2 })
    );
}

#[tokio::test]
async fn checker_reports_unreachable_endpoint() {
    // Bind then drop to get a port nothing listens on.
    let address = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().to_string()
    };
    let client = Arc::new(HttpHeartbeatClient::new(&address).unwrap());
    let (tx, mut reports) = tokio::sync::mpsc::channel(1);

    let config = HealthCheckConfig {
        interval: Duration::from_millis(20),
        max_heartbeat_retries: 2,
        retry: RetryPolicy::new(2, Duration::from_millis(5)),
        probe_timeout: Duration::from_millis(500),
    };
    let _handle = HealthChecker::spawn(
        RegistrantInfo::new("gone", address),
        client,
        Arc::new(MetricsAggregator::new(8)),
        tx,
        config,
    );

    let report = tokio::time::timeout(Duration::from_secs(5), reports.recv())
        .await
        .expect("checker should give up")
        .unwrap();
    assert_eq!(report.reason, TerminationReason::Unreachable);
    assert_eq!(report.registrant.service_name, "gone");
}
