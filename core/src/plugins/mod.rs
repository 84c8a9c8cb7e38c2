//! Concrete plugins for the backend this client talks to.
//!
//! The stock stack is `[logger, auth, response]`: the logger sees every
//! response envelope before the response plugin unwraps it, and the auth
//! plugin runs before the transport picks up the headers.

pub mod auth;
pub mod logger;
pub mod response;

use std::sync::Arc;

use crate::credentials::CredentialStore;
use crate::plugin::Plugin;

pub use auth::{auth_plugin, auth_plugin_with_store, AUTH_PLUGIN};
pub use logger::{logger_plugin, LOGGER_PLUGIN};
pub use response::{business_error_detector, response_plugin, RESPONSE_PLUGIN};

/// The plugin stack the app registers: logger, auth, response.
pub fn default_plugins(store: Arc<dyn CredentialStore>) -> Vec<Plugin> {
    vec![
        logger_plugin(),
        auth_plugin_with_store(Arc::clone(&store)),
        response_plugin(business_error_detector(store)),
    ]
}
