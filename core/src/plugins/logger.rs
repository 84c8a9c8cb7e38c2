//! Request/response logging through `tracing`.

use futures::future;
use tracing::info;

use crate::http::{Headers, RequestDescriptor, AUTHORIZATION};
use crate::plugin::{Plugin, Received};

pub const LOGGER_PLUGIN: &str = "logger";

/// Log every request before it is sent and every response as it passes.
/// The response is returned untouched.
pub fn logger_plugin() -> Plugin {
    Plugin::new(LOGGER_PLUGIN)
        .on_will_send(|descriptor: &RequestDescriptor| {
            info!(
                url = %descriptor.url,
                method = %descriptor.method,
                headers = ?redacted(&descriptor.headers),
                auth = descriptor.requires_auth,
                "request"
            );
            Ok(())
        })
        .on_did_receive(|received: Received| {
            match &received {
                Received::Envelope(envelope) => {
                    info!(status = envelope.status, data = %envelope.data, "response");
                }
                Received::Value(value) => info!(value = %value, "response"),
            }
            future::ready(Ok(received))
        })
}

/// Copy of `headers` with the bearer token masked.
fn redacted(headers: &Headers) -> Headers {
    let mut headers = headers.clone();
    for (name, value) in headers.iter_mut() {
        if name.eq_ignore_ascii_case(AUTHORIZATION) {
            *value = "Bearer <redacted>".to_string();
        }
    }
    headers
}
