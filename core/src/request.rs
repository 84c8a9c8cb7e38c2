//! Request normalization.
//!
//! # Design
//! `normalize` turns a `(method, url, data, options)` call into a
//! `RequestDescriptor` before any plugin or transport runs. It is pure and
//! synchronous: an unencodable payload fails here, at the call site, instead
//! of surfacing later from the transport.

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{
    set_header, HeaderInput, Headers, HttpMethod, RequestDescriptor, TransportChoice,
    APPLICATION_JSON, CONTENT_TYPE,
};

/// Per-call options recognised by the normalizer.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Ask the auth plugin to attach credentials. Defaults to false.
    pub auth: bool,
    /// Transport strategy. `None` selects `TransportChoice::Client`.
    pub transport: Option<TransportChoice>,
    /// Caller headers, merged over the normalizer's defaults.
    pub headers: Option<HeaderInput>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auth(mut self, auth: bool) -> Self {
        self.auth = auth;
        self
    }

    pub fn transport(mut self, transport: TransportChoice) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn headers(mut self, headers: impl Into<HeaderInput>) -> Self {
        self.headers = Some(headers.into());
        self
    }
}

/// Build the descriptor for one call.
///
/// Body-bearing methods get `Content-Type: application/json` unless the
/// caller's headers set a content type under any casing; GET and DELETE never carry a body,
/// whatever `data` holds.
pub fn normalize<B>(
    base_url: &str,
    method: HttpMethod,
    url: &str,
    data: Option<&B>,
    options: RequestOptions,
) -> Result<RequestDescriptor, ApiError>
where
    B: Serialize + ?Sized,
{
    let RequestOptions {
        auth,
        transport,
        headers,
    } = options;
    let mut merged = Headers::new();
    let body = if method.carries_body() {
        merged.insert(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string());
        data.map(encode_body).transpose()?
    } else {
        None
    };
    for (name, value) in headers.map(HeaderInput::normalize).unwrap_or_default() {
        set_header(&mut merged, name, value);
    }

    Ok(RequestDescriptor {
        url: resolve_url(base_url, url),
        method,
        headers: merged,
        body,
        requires_auth: auth,
        transport: transport.unwrap_or_default(),
    })
}

/// Absolute URLs pass through verbatim; anything else is appended to
/// `base_url` as-is.
pub fn resolve_url(base_url: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("{base_url}{url}")
    }
}

/// Encode a payload as the request body. Strings are sent unchanged.
pub fn encode_body<B>(data: &B) -> Result<String, ApiError>
where
    B: Serialize + ?Sized,
{
    match serde_json::to_value(data)? {
        Value::String(text) => Ok(text),
        value => Ok(value.to_string()),
    }
}
