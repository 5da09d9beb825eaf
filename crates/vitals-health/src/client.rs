//! Heartbeat client — one request/response probe against a control endpoint.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use tracing::debug;

use vitals_core::{HeartbeatRequest, HeartbeatResponse};

use crate::error::HeartbeatError;

/// Path served by a registrant's control endpoint.
pub const HEARTBEAT_PATH: &str = "/heartbeat";

/// Performs a single heartbeat round trip.
///
/// `Ok(None)` means the call itself succeeded but carried no payload.
#[async_trait]
pub trait HeartbeatClient: Send + Sync {
    async fn heartbeat(
        &self,
        request: &HeartbeatRequest,
    ) -> Result<Option<HeartbeatResponse>, HeartbeatError>;
}

/// JSON-over-HTTP/1 heartbeat client.
///
/// Sends `POST /heartbeat` with the request as its JSON body. A fresh
/// connection is opened per call.
#[derive(Debug, Clone)]
pub struct HttpHeartbeatClient {
    address: String,
}

impl HttpHeartbeatClient {
    /// Create a client for a `host:port` control address. A leading
    /// `http://` is accepted and stripped.
    pub fn new(control_address: &str) -> Result<Self, HeartbeatError> {
        let address = control_address
            .trim()
            .trim_start_matches("http://")
            .trim_end_matches('/');
        if address.is_empty() || address.contains('/') {
            return Err(HeartbeatError::InvalidAddress(control_address.to_string()));
        }
        Ok(Self {
            address: address.to_string(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl HeartbeatClient for HttpHeartbeatClient {
    async fn heartbeat(
        &self,
        request: &HeartbeatRequest,
    ) -> Result<Option<HeartbeatResponse>, HeartbeatError> {
        let uri = format!("http://{}{HEARTBEAT_PATH}", self.address);

        let stream = tokio::net::TcpStream::connect(self.address.as_str()).await?;
        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| HeartbeatError::Handshake(e.to_string()))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let body = serde_json::to_vec(request)?;
        let req = http::Request::builder()
            .method(http::Method::POST)
            .uri(&uri)
            .header(http::header::HOST, &self.address)
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(http::header::USER_AGENT, "vitals-health/0.1")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| HeartbeatError::Request(e.to_string()))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| HeartbeatError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            debug!(%status, %uri, "heartbeat non-2xx");
            return Err(HeartbeatError::Status(status.as_u16()));
        }

        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| HeartbeatError::Request(e.to_string()))?
            .to_bytes();

        decode_response(&bytes)
    }
}

/// Decode a heartbeat body. An empty body or JSON `null` yields `None`.
fn decode_response(body: &[u8]) -> Result<Option<HeartbeatResponse>, HeartbeatError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(serde_json::from_slice::<Option<HeartbeatResponse>>(body)?)
}
