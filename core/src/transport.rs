//! Transport adapter.
//!
//! # Design
//! `Transport` is the seam between the pipeline and the network: one call in,
//! one `ResponseEnvelope` out. `HttpTransport` carries both strategies and
//! picks one per descriptor:
//!
//! - `TransportChoice::Client` goes through an async `reqwest::Client`. Bodies
//!   are decoded leniently: empty means `null`, non-JSON text comes back as a
//!   JSON string.
//! - `TransportChoice::Fetch` goes through a blocking `ureq::Agent` on the
//!   blocking pool. The body must be JSON. ureq's default 10 MB read cap is
//!   lifted so both strategies accept the same body sizes.
//!
//! Neither strategy treats 4xx/5xx as an error; the status is data for the
//! response plugin. Both enforce the configured timeout as a whole-request
//! deadline. Nothing here retries.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;
use crate::http::{Headers, HttpMethod, RequestDescriptor, ResponseEnvelope, TransportChoice};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &RequestDescriptor) -> Result<ResponseEnvelope, ApiError>;
}

/// The production transport, holding one client per strategy.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    agent: ureq::Agent,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Ok(Self {
            client,
            agent,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn execute_client(&self, request: &RequestDescriptor) -> Result<ResponseEnvelope, ApiError> {
        let mut builder = self.client.request(request.method.into(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| self.client_error(e))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| self.client_error(e))?;

        Ok(ResponseEnvelope::new(status, decode_lenient(&text)))
    }

    async fn execute_fetch(&self, request: &RequestDescriptor) -> Result<ResponseEnvelope, ApiError> {
        let agent = self.agent.clone();
        let request = request.clone();
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || fetch_blocking(&agent, &request, timeout))
            .await
            .map_err(|e| ApiError::NetworkError(format!("fetch task failed: {e}")))?
    }

    fn client_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else {
            ApiError::NetworkError(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &RequestDescriptor) -> Result<ResponseEnvelope, ApiError> {
        debug!(
            method = %request.method,
            url = %request.url,
            transport = ?request.transport,
            "executing request"
        );
        let envelope = match request.transport {
            TransportChoice::Client => self.execute_client(request).await?,
            TransportChoice::Fetch => self.execute_fetch(request).await?,
        };
        debug!(status = envelope.status, url = %request.url, "request completed");
        Ok(envelope)
    }
}

fn fetch_blocking(
    agent: &ureq::Agent,
    request: &RequestDescriptor,
    timeout: Duration,
) -> Result<ResponseEnvelope, ApiError> {
    let url = request.url.as_str();
    let body = request.body.as_deref();
    let result = match request.method {
        HttpMethod::Get => with_headers(agent.get(url), &request.headers).call(),
        HttpMethod::Delete => with_headers(agent.delete(url), &request.headers).call(),
        HttpMethod::Post => send(with_headers(agent.post(url), &request.headers), body),
        HttpMethod::Put => send(with_headers(agent.put(url), &request.headers), body),
        HttpMethod::Patch => send(with_headers(agent.patch(url), &request.headers), body),
    };
    let mut response = result.map_err(|e| fetch_error(e, timeout))?;

    let status = response.status().as_u16();
    let text = response
        .body_mut()
        .with_config()
        .limit(u64::MAX)
        .read_to_string()
        .map_err(|e| fetch_error(e, timeout))?;
    let data: Value = serde_json::from_str(&text)
        .map_err(|e| ApiError::NetworkError(format!("response body is not valid JSON: {e}")))?;

    Ok(ResponseEnvelope::new(status, data))
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &Headers) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<&str>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

fn fetch_error(err: ureq::Error, timeout: Duration) -> ApiError {
    match err {
        ureq::Error::Timeout(_) => ApiError::Timeout(timeout),
        other => ApiError::NetworkError(other.to_string()),
    }
}

/// Decode a body the way the client strategy promises: empty is `null`,
/// JSON is parsed, anything else is kept as a string.
fn decode_lenient(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue};
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::request::{normalize, RequestOptions};

    const BOTH: [TransportChoice; 2] = [TransportChoice::Client, TransportChoice::Fetch];

    /// Accept one connection, answer 200 with `body` and return the raw
    /// request head.
    async fn serve_once(listener: TcpListener, body: Vec<u8>) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut chunk = [0u8; 4096];
        let head_len = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before request finished");
            received.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&received);
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if received.len() >= end + 4 + content_length {
                    break end;
                }
            }
        };

        let head = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(&body).await.unwrap();
        socket.shutdown().await.unwrap();

        String::from_utf8_lossy(&received[..head_len]).into_owned()
    }

    #[test]
    fn lenient_decode_parses_json() {
        assert_eq!(decode_lenient(r#"{"errorCode":0}"#), json!({"errorCode": 0}));
        assert_eq!(decode_lenient("[1,2]"), json!([1, 2]));
    }

    #[test]
    fn lenient_decode_keeps_text() {
        assert_eq!(decode_lenient("<html>oops</html>"), json!("<html>oops</html>"));
    }

    #[test]
    fn lenient_decode_empty_is_null() {
        assert_eq!(decode_lenient(""), Value::Null);
        assert_eq!(decode_lenient("  \n"), Value::Null);
    }

    #[test]
    fn transport_keeps_configured_timeout() {
        let transport = HttpTransport::new(Duration::from_millis(2500)).unwrap();
        assert_eq!(transport.timeout(), Duration::from_millis(2500));
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        // Bind then drop to get a port nothing is listening on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();

        for choice in [TransportChoice::Client, TransportChoice::Fetch] {
            let request = RequestDescriptor {
                url: format!("http://127.0.0.1:{port}/banner/json"),
                method: HttpMethod::Get,
                headers: Headers::new(),
                body: None,
                requires_auth: false,
                transport: choice,
            };
            let err = transport.execute(&request).await.unwrap_err();
            assert!(err.is_network(), "{choice:?}: expected network error, got {err:?}");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn caller_content_type_goes_out_once() {
        let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();

        for choice in BOTH {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            let server = tokio::spawn(serve_once(listener, b"{}".to_vec()));

            let mut caller = HeaderMap::new();
            caller.insert(reqwest::header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
            let options = RequestOptions::new().headers(caller).transport(choice);
            let request = normalize(&base_url, HttpMethod::Post, "/raw", Some("hello"), options).unwrap();

            let envelope = transport.execute(&request).await.unwrap();
            assert_eq!(envelope.status, 200, "{choice:?}");

            let head = server.await.unwrap();
            let content_types: Vec<&str> = head
                .lines()
                .filter(|line| line.to_ascii_lowercase().starts_with("content-type:"))
                .collect();
            assert_eq!(content_types.len(), 1, "{choice:?}: {content_types:?}");
            assert!(content_types[0].ends_with("text/plain"), "{choice:?}: {content_types:?}");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn large_bodies_are_read_by_both_strategies() {
        let transport = HttpTransport::new(Duration::from_secs(10)).unwrap();
        let text = "a".repeat(11 * 1024 * 1024);
        let body = serde_json::to_vec(&json!({"errorCode": 0, "data": text})).unwrap();

        for choice in BOTH {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let url = format!("http://{}/big", listener.local_addr().unwrap());
            let server = tokio::spawn(serve_once(listener, body.clone()));

            let request = RequestDescriptor {
                url,
                method: HttpMethod::Get,
                headers: Headers::new(),
                body: None,
                requires_auth: false,
                transport: choice,
            };
            let envelope = transport.execute(&request).await.unwrap();
            server.await.unwrap();
            assert_eq!(envelope.data["data"].as_str().map(str::len), Some(text.len()), "{choice:?}");
        }
    }
}
