//! Bearer-token injection.
//!
//! Only descriptors flagged `requires_auth` are touched. A missing token or a
//! failing getter is logged and the request goes out unauthenticated; the
//! server's rejection then comes back through the response plugin.

use std::sync::Arc;

use tracing::warn;

use crate::credentials::CredentialStore;
use crate::error::ApiError;
use crate::http::{RequestDescriptor, AUTHORIZATION};
use crate::plugin::Plugin;

pub const AUTH_PLUGIN: &str = "auth";

/// Build the auth plugin around a token getter.
pub fn auth_plugin<F>(get_token: F) -> Plugin
where
    F: Fn() -> Result<Option<String>, ApiError> + Send + Sync + 'static,
{
    let get_token = Arc::new(get_token);
    Plugin::new(AUTH_PLUGIN).on_prepare(move |descriptor: RequestDescriptor| {
        let authorized = authorize(descriptor, &*get_token);
        async move { Ok(authorized) }
    })
}

/// Build the auth plugin reading the token from `store`.
pub fn auth_plugin_with_store(store: Arc<dyn CredentialStore>) -> Plugin {
    auth_plugin(move || store.token())
}

fn authorize(
    descriptor: RequestDescriptor,
    get_token: &dyn Fn() -> Result<Option<String>, ApiError>,
) -> RequestDescriptor {
    if !descriptor.requires_auth {
        return descriptor;
    }
    match get_token() {
        Ok(Some(token)) if !token.is_empty() => {
            descriptor.with_header(AUTHORIZATION, format!("Bearer {token}"))
        }
        Ok(_) => {
            warn!(url = %descriptor.url, "no stored token, sending request unauthenticated");
            descriptor
        }
        Err(err) => {
            warn!(url = %descriptor.url, error = %err, "failed to read token");
            descriptor
        }
    }
}
