//! Response validation and business-error translation.
//!
//! The backend wraps every payload as `{errorCode, errorMsg, data}`. The
//! plugin rejects non-2xx statuses and unstructured bodies, hands the payload
//! to an injected detector, then unwraps one level of envelope.

use std::sync::Arc;

use futures::future;
use serde_json::Value;
use tracing::{debug, warn};

use crate::credentials::CredentialStore;
use crate::error::ApiError;
use crate::plugin::{Plugin, Received};

pub const RESPONSE_PLUGIN: &str = "response";

/// Business code for success.
pub const CODE_SUCCESS: i64 = 0;
/// Business code for an expired or missing session.
pub const CODE_UNAUTHORIZED: i64 = 401;
/// Message used when the backend reports a failure without `errorMsg`.
pub const DEFAULT_FAILURE_MESSAGE: &str = "request failed";

/// Build the response plugin around a business-error detector.
pub fn response_plugin<F>(detect: F) -> Plugin
where
    F: Fn(&Value) -> Result<(), ApiError> + Send + Sync + 'static,
{
    let detect = Arc::new(detect);
    Plugin::new(RESPONSE_PLUGIN).on_did_receive(move |received: Received| {
        future::ready(check_response(received, &*detect))
    })
}

fn check_response(
    received: Received,
    detect: &dyn Fn(&Value) -> Result<(), ApiError>,
) -> Result<Received, ApiError> {
    let envelope = match received {
        Received::Envelope(envelope) => envelope,
        Received::Value(_) => return Err(ApiError::InvalidPayload),
    };
    if !envelope.is_success() {
        return Err(ApiError::HttpError {
            status: envelope.status,
        });
    }
    if !matches!(envelope.data, Value::Object(_) | Value::Array(_)) {
        return Err(ApiError::InvalidPayload);
    }
    detect(&envelope.data)?;
    Ok(Received::Value(unwrap_data(envelope.data)))
}

/// Return the payload's non-null `data` field, or the payload itself.
fn unwrap_data(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) => match map.remove("data") {
            Some(inner) if !inner.is_null() => inner,
            removed => {
                if let Some(inner) = removed {
                    map.insert("data".to_string(), inner);
                }
                Value::Object(map)
            }
        },
        other => other,
    }
}

/// Detector for the backend's `errorCode` convention.
///
/// Anything other than exactly `0` is a failure, including a missing code.
/// `401` clears the stored token and yields `AuthRequired`.
pub fn business_error_detector(
    store: Arc<dyn CredentialStore>,
) -> impl Fn(&Value) -> Result<(), ApiError> + Send + Sync + 'static {
    move |payload: &Value| {
        let code = payload.get("errorCode").and_then(error_code);
        match code {
            Some(CODE_SUCCESS) => Ok(()),
            Some(CODE_UNAUTHORIZED) => {
                debug!("session rejected, clearing stored token");
                if let Err(err) = store.delete_token() {
                    warn!(error = %err, "failed to clear stored token");
                }
                Err(ApiError::AuthRequired)
            }
            code => {
                let message = payload
                    .get("errorMsg")
                    .and_then(Value::as_str)
                    .filter(|msg| !msg.is_empty())
                    .unwrap_or(DEFAULT_FAILURE_MESSAGE)
                    .to_string();
                Err(ApiError::BusinessError { code, message })
            }
        }
    }
}

/// Integral codes only; `0.0` and `401.0` count the same as `0` and `401`.
fn error_code(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64)
    })
}
