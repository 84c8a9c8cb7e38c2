//! HTTP client core for the mobile app's backend.
//!
//! # Overview
//! A `Provider` turns verb calls (`get`, `post`, `put`, `delete`, `patch`)
//! into requests, runs them through an ordered plugin pipeline, executes them
//! on one of two transport strategies, and returns the decoded result.
//!
//! # Design
//! - `request::normalize` builds a `RequestDescriptor` synchronously, so
//!   encoding errors surface at the call site.
//! - `Plugin`s carry up to three optional hooks (`prepare`, `will_send`,
//!   `did_receive`) that run strictly in registration order.
//! - The stock plugins attach the bearer token, translate the backend's
//!   `errorCode` convention into `ApiError`s, and log through `tracing`.
//! - Stateful collaborators (the credential store, the business-error
//!   detector) are injected when plugins are built; there are no globals.
//! - `Transport` is the only I/O seam. `HttpTransport` offers a full async
//!   client and a minimal fetch-style client, chosen per request.

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod plugin;
pub mod plugins;
pub mod provider;
pub mod request;
pub mod transport;
pub mod types;

pub use api::HomeApi;
pub use config::{Environment, ProviderConfig};
pub use credentials::{CredentialStore, MemoryCredentialStore};
pub use error::ApiError;
pub use http::{
    HeaderInput, Headers, HttpMethod, RequestDescriptor, ResponseEnvelope, TransportChoice,
};
pub use plugin::{Pipeline, Plugin, Received};
pub use provider::{Provider, ProviderBuilder};
pub use request::RequestOptions;
pub use transport::{HttpTransport, Transport};
pub use types::{Article, Banner, PageData};
