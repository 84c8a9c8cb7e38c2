//! Plugins and the pipeline that runs them.
//!
//! # Design
//! A `Plugin` is a named bundle of three optional hooks. A missing hook is an
//! explicit `None` and the pipeline skips it. Hooks run strictly one after
//! another in registration order, never concurrently, because later plugins
//! depend on what earlier ones did (the logger should see the header the auth
//! plugin added). The first hook error aborts the call.
//!
//! - `prepare` receives the previous plugin's descriptor and returns the next.
//! - `will_send` only observes. It gets a shared reference to the final
//!   descriptor, so it cannot change what the transport sends.
//! - `did_receive` receives the previous plugin's `Received` value and returns
//!   the next; the last one becomes the call's result.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{json, Value};
use tracing::trace;

use crate::error::ApiError;
use crate::http::{RequestDescriptor, ResponseEnvelope};

pub type HookFuture<T> = BoxFuture<'static, Result<T, ApiError>>;
pub type PrepareHook = Arc<dyn Fn(RequestDescriptor) -> HookFuture<RequestDescriptor> + Send + Sync>;
pub type WillSendHook = Arc<dyn Fn(&RequestDescriptor) -> Result<(), ApiError> + Send + Sync>;
pub type DidReceiveHook = Arc<dyn Fn(Received) -> HookFuture<Received> + Send + Sync>;

/// The value threaded through `did_receive` hooks.
///
/// The first hook always sees the transport's `Envelope`. A hook that unwraps
/// the business payload hands a `Value` to the hooks after it.
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    Envelope(ResponseEnvelope),
    Value(Value),
}

impl Received {
    /// Collapse into JSON. An untouched envelope becomes
    /// `{"status": .., "data": ..}`.
    pub fn into_value(self) -> Value {
        match self {
            Received::Envelope(envelope) => json!({
                "status": envelope.status,
                "data": envelope.data,
            }),
            Received::Value(value) => value,
        }
    }
}

impl From<ResponseEnvelope> for Received {
    fn from(envelope: ResponseEnvelope) -> Self {
        Received::Envelope(envelope)
    }
}

/// A named bundle of optional lifecycle hooks.
#[derive(Clone)]
pub struct Plugin {
    name: String,
    pub prepare: Option<PrepareHook>,
    pub will_send: Option<WillSendHook>,
    pub did_receive: Option<DidReceiveHook>,
}

impl Plugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prepare: None,
            will_send: None,
            did_receive: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn on_prepare<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RequestDescriptor) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RequestDescriptor, ApiError>> + Send + 'static,
    {
        let hook: PrepareHook = Arc::new(move |descriptor: RequestDescriptor| f(descriptor).boxed());
        self.prepare = Some(hook);
        self
    }

    pub fn on_will_send<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestDescriptor) -> Result<(), ApiError> + Send + Sync + 'static,
    {
        let hook: WillSendHook = Arc::new(f);
        self.will_send = Some(hook);
        self
    }

    pub fn on_did_receive<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Received) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Received, ApiError>> + Send + 'static,
    {
        let hook: DidReceiveHook = Arc::new(move |received: Received| f(received).boxed());
        self.did_receive = Some(hook);
        self
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("prepare", &self.prepare.is_some())
            .field("will_send", &self.will_send.is_some())
            .field("did_receive", &self.did_receive.is_some())
            .finish()
    }
}

/// An ordered, immutable list of plugins.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    plugins: Arc<Vec<Plugin>>,
}

impl Pipeline {
    pub fn new(plugins: Vec<Plugin>) -> Self {
        Self {
            plugins: Arc::new(plugins),
        }
    }

    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    pub async fn prepare(&self, descriptor: RequestDescriptor) -> Result<RequestDescriptor, ApiError> {
        let mut descriptor = descriptor;
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.prepare {
                trace!(plugin = plugin.name(), "prepare");
                descriptor = hook(descriptor).await?;
            }
        }
        Ok(descriptor)
    }

    pub fn will_send(&self, descriptor: &RequestDescriptor) -> Result<(), ApiError> {
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.will_send {
                trace!(plugin = plugin.name(), "will_send");
                hook(descriptor)?;
            }
        }
        Ok(())
    }

    pub async fn did_receive(&self, received: Received) -> Result<Received, ApiError> {
        let mut received = received;
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.did_receive {
                trace!(plugin = plugin.name(), "did_receive");
                received = hook(received).await?;
            }
        }
        Ok(received)
    }
}
