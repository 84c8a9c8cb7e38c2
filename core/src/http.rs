//! HTTP descriptor and envelope types.
//!
//! # Design
//! A `RequestDescriptor` is the fully resolved description of one outbound
//! call and a `ResponseEnvelope` is the decoded result of one exchange. Both
//! are plain owned data, created fresh per call and dropped once the call
//! resolves. Plugins receive them by value, so "rewriting" a descriptor always
//! produces a new value and never touches a descriptor another step holds.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const AUTHORIZATION: &str = "Authorization";
pub const APPLICATION_JSON: &str = "application/json";

/// Header name to value. Keys keep the case they were supplied with, but
/// names are unique ignoring case.
pub type Headers = BTreeMap<String, String>;

/// Set `name` to `value`, dropping any entry whose name differs only in case.
pub fn set_header(headers: &mut Headers, name: String, value: String) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
    headers.insert(name, value);
}

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// POST, PUT and PATCH carry a JSON body; GET and DELETE never do.
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

/// Which transport strategy executes a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportChoice {
    /// Full-featured async client. Any body is accepted; non-JSON bodies
    /// come back as a JSON string.
    #[default]
    Client,
    /// Minimal fetch-style call. The body must decode as JSON.
    Fetch,
}

/// Caller-supplied headers in any of the accepted shapes.
#[derive(Debug, Clone)]
pub enum HeaderInput {
    /// Plain key-value mapping, taken as already normalized.
    Map(Headers),
    /// Ordered name/value pairs. Later pairs win on duplicate names,
    /// compared ignoring case.
    Pairs(Vec<(String, String)>),
    /// A header collection. Names come back lowercased, as the collection
    /// stores them.
    Collection(HeaderMap),
}

impl HeaderInput {
    /// Flatten into a plain case-preserving mapping.
    pub fn normalize(self) -> Headers {
        match self {
            HeaderInput::Map(map) => map,
            HeaderInput::Pairs(pairs) => {
                let mut headers = Headers::new();
                for (name, value) in pairs {
                    set_header(&mut headers, name, value);
                }
                headers
            }
            HeaderInput::Collection(map) => map
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
        }
    }
}

impl From<Headers> for HeaderInput {
    fn from(map: Headers) -> Self {
        HeaderInput::Map(map)
    }
}

impl From<HashMap<String, String>> for HeaderInput {
    fn from(map: HashMap<String, String>) -> Self {
        HeaderInput::Map(map.into_iter().collect())
    }
}

impl From<Vec<(String, String)>> for HeaderInput {
    fn from(pairs: Vec<(String, String)>) -> Self {
        HeaderInput::Pairs(pairs)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for HeaderInput {
    fn from(pairs: [(&str, &str); N]) -> Self {
        HeaderInput::Pairs(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl From<HeaderMap> for HeaderInput {
    fn from(map: HeaderMap) -> Self {
        HeaderInput::Collection(map)
    }
}

/// One outbound call, fully resolved.
///
/// Built by `request::normalize`, rewritten by `prepare` hooks, observed by
/// `will_send` hooks and finally handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Headers,
    pub body: Option<String>,
    pub requires_auth: bool,
    pub transport: TransportChoice,
}

impl RequestDescriptor {
    /// Return a copy of this descriptor with `name` set to `value`. An
    /// existing header with the same name in another case is replaced.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name.into(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// The decoded result of one transport exchange, before any business-level
/// unwrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub data: Value,
}

impl ResponseEnvelope {
    pub fn new(status: u16, data: Value) -> Self {
        Self { status, data }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
