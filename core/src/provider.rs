//! The client facade.
//!
//! # Design
//! `Provider` owns an immutable configuration, a plugin pipeline and a
//! transport. Every verb method runs the same linear sequence:
//!
//! normalize -> prepare -> will_send -> transport -> did_receive -> decode
//!
//! Nothing is kept between calls, so clones of one `Provider` can serve any
//! number of concurrent calls. Any step's error is returned as-is. There is
//! at most one transport attempt per call.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::config::ProviderConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, RequestDescriptor};
use crate::plugin::{Pipeline, Plugin, Received};
use crate::request::{normalize, RequestOptions};
use crate::transport::{HttpTransport, Transport};

#[derive(Clone)]
pub struct Provider {
    config: ProviderConfig,
    pipeline: Pipeline,
    transport: Arc<dyn Transport>,
}

impl Provider {
    pub fn builder(config: ProviderConfig) -> ProviderBuilder {
        ProviderBuilder {
            config,
            plugins: Vec::new(),
            transport: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    pub fn plugins(&self) -> &[Plugin] {
        self.pipeline.plugins()
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str, options: RequestOptions) -> Result<T, ApiError> {
        self.call(HttpMethod::Get, url, None::<&Value>, options).await
    }

    pub async fn post<T, B>(&self, url: &str, data: Option<&B>, options: RequestOptions) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(HttpMethod::Post, url, data, options).await
    }

    pub async fn put<T, B>(&self, url: &str, data: Option<&B>, options: RequestOptions) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(HttpMethod::Put, url, data, options).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, url: &str, options: RequestOptions) -> Result<T, ApiError> {
        self.call(HttpMethod::Delete, url, None::<&Value>, options).await
    }

    pub async fn patch<T, B>(&self, url: &str, data: Option<&B>, options: RequestOptions) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(HttpMethod::Patch, url, data, options).await
    }

    /// Build the descriptor a verb method would send, without sending it.
    pub fn describe<B>(
        &self,
        method: HttpMethod,
        url: &str,
        data: Option<&B>,
        options: RequestOptions,
    ) -> Result<RequestDescriptor, ApiError>
    where
        B: Serialize + ?Sized,
    {
        normalize(&self.config.base_url, method, url, data, options)
    }

    /// Run an already-normalized descriptor through the pipeline.
    #[instrument(name = "provider_send", skip_all, fields(method = %descriptor.method, url = %descriptor.url))]
    pub async fn send<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T, ApiError> {
        let prepared = self.pipeline.prepare(descriptor).await?;
        self.pipeline.will_send(&prepared)?;
        let envelope = self.transport.execute(&prepared).await?;
        let received = self.pipeline.did_receive(Received::Envelope(envelope)).await?;
        serde_json::from_value(received.into_value()).map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    async fn call<T, B>(
        &self,
        method: HttpMethod,
        url: &str,
        data: Option<&B>,
        options: RequestOptions,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let descriptor = self.describe(method, url, data, options)?;
        self.send(descriptor).await
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

/// Assembles a `Provider`. Plugins run in the order they are added.
pub struct ProviderBuilder {
    config: ProviderConfig,
    plugins: Vec<Plugin>,
    transport: Option<Arc<dyn Transport>>,
}

impl ProviderBuilder {
    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn plugins(mut self, plugins: impl IntoIterator<Item = Plugin>) -> Self {
        self.plugins.extend(plugins);
        self
    }

    /// Replace the default `HttpTransport`.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Provider, ApiError> {
        self.config.validate()?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(self.config.timeout())?),
        };
        Ok(Provider {
            config: self.config,
            pipeline: Pipeline::new(self.plugins),
            transport,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::credentials::{CredentialStore, MemoryCredentialStore};
    use crate::http::{ResponseEnvelope, TransportChoice, AUTHORIZATION, CONTENT_TYPE};
    use crate::plugins::default_plugins;

    const BASE_URL: &str = "https://api.example.com";

    /// Records every descriptor and answers with a canned envelope.
    struct StubTransport {
        sent: Mutex<Vec<RequestDescriptor>>,
        reply: ResponseEnvelope,
    }

    impl StubTransport {
        fn replying(status: u16, data: Value) -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                reply: ResponseEnvelope::new(status, data),
            })
        }

        fn sent(&self) -> Vec<RequestDescriptor> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn execute(&self, request: &RequestDescriptor) -> Result<ResponseEnvelope, ApiError> {
            self.sent.lock().push(request.clone());
            Ok(self.reply.clone())
        }
    }

    fn provider(transport: Arc<StubTransport>, plugins: Vec<Plugin>) -> Provider {
        Provider::builder(ProviderConfig::new(BASE_URL))
            .plugins(plugins)
            .transport(transport)
            .build()
            .unwrap()
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    #[tokio::test]
    async fn resolves_to_unwrapped_business_data() {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        let transport = StubTransport::replying(200, json!({"errorCode": 0, "data": {"id": 1}}));
        let provider = provider(transport, default_plugins(store));

        let item: Item = provider.get("/item", RequestOptions::new()).await.unwrap();
        assert_eq!(item, Item { id: 1 });
    }

    #[tokio::test]
    async fn auth_header_reaches_transport() {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::with_token("abc"));
        let transport = StubTransport::replying(200, json!({"errorCode": 0}));
        let provider = provider(Arc::clone(&transport), default_plugins(store));

        let _: Value = provider.get("/user/info", RequestOptions::new().auth(true)).await.unwrap();
        let _: Value = provider.get("/banner/json", RequestOptions::new()).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0].header(AUTHORIZATION), Some("Bearer abc"));
        assert_eq!(sent[1].header(AUTHORIZATION), None);
    }

    #[tokio::test]
    async fn unauthorized_code_clears_token() {
        let store = Arc::new(MemoryCredentialStore::with_token("stale"));
        let transport = StubTransport::replying(200, json!({"errorCode": 401, "errorMsg": "login"}));
        let provider = provider(transport, default_plugins(store.clone()));

        let err = provider
            .get::<Value>("/user/info", RequestOptions::new().auth(true))
            .await
            .unwrap_err();
        assert!(err.is_auth_required());
        assert_eq!(store.token().unwrap(), None);
    }

    #[tokio::test]
    async fn post_sends_json_body() {
        let transport = StubTransport::replying(200, json!({"ok": true}));
        let provider = provider(Arc::clone(&transport), Vec::new());

        let _: Value = provider
            .post("/todos", Some(&json!({"title": "Buy milk"})), RequestOptions::new())
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].url, "https://api.example.com/todos");
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"title":"Buy milk"}"#));
        assert_eq!(sent[0].header(CONTENT_TYPE), Some("application/json"));
    }

    #[tokio::test]
    async fn every_verb_uses_its_method() {
        let transport = StubTransport::replying(200, json!({}));
        let provider = provider(Arc::clone(&transport), Vec::new());
        let body = json!({"a": 1});

        let _: Value = provider.get("/x", RequestOptions::new()).await.unwrap();
        let _: Value = provider.post("/x", Some(&body), RequestOptions::new()).await.unwrap();
        let _: Value = provider.put("/x", Some(&body), RequestOptions::new()).await.unwrap();
        let _: Value = provider.delete("/x", RequestOptions::new()).await.unwrap();
        let _: Value = provider.patch("/x", Some(&body), RequestOptions::new()).await.unwrap();

        let methods: Vec<HttpMethod> = transport.sent().iter().map(|d| d.method).collect();
        assert_eq!(
            methods,
            vec![HttpMethod::Get, HttpMethod::Post, HttpMethod::Put, HttpMethod::Delete, HttpMethod::Patch]
        );
    }

    #[tokio::test]
    async fn without_plugins_result_is_raw_envelope() {
        let transport = StubTransport::replying(404, json!({"msg": "nope"}));
        let provider = provider(transport, Vec::new());

        let envelope: ResponseEnvelope = provider.get("/missing", RequestOptions::new()).await.unwrap();
        assert_eq!(envelope, ResponseEnvelope::new(404, json!({"msg": "nope"})));
    }

    #[tokio::test]
    async fn prepare_failure_never_reaches_transport() {
        let transport = StubTransport::replying(200, json!({}));
        let failing = Plugin::new("failing")
            .on_prepare(|_| async { Err::<RequestDescriptor, _>(ApiError::CredentialError("locked".to_string())) });
        let provider = provider(Arc::clone(&transport), vec![failing]);

        let err = provider.get::<Value>("/x", RequestOptions::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::CredentialError(_)));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn will_send_sees_prepared_descriptor() {
        let seen = Arc::new(Mutex::new(None));
        let observed = Arc::clone(&seen);
        let tagger = Plugin::new("tagger")
            .on_prepare(|d: RequestDescriptor| async move { Ok(d.with_header("X-Tag", "1")) });
        let observer = Plugin::new("observer").on_will_send(move |d: &RequestDescriptor| {
            *observed.lock() = d.header("X-Tag").map(str::to_string);
            Ok(())
        });
        let transport = StubTransport::replying(200, json!({}));
        let provider = provider(transport, vec![observer, tagger]);

        let _: Value = provider.get("/x", RequestOptions::new()).await.unwrap();
        assert_eq!(seen.lock().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn result_type_mismatch_is_deserialization_error() {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        let transport = StubTransport::replying(200, json!({"errorCode": 0, "data": "text"}));
        let provider = provider(transport, default_plugins(store));

        let err = provider.get::<Item>("/item", RequestOptions::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[tokio::test]
    async fn serialization_failure_surfaces_before_send() {
        let transport = StubTransport::replying(200, json!({}));
        let provider = provider(Arc::clone(&transport), Vec::new());
        let mut bad = std::collections::HashMap::new();
        bad.insert((1u8, 2u8), 3u8);

        let err = provider.post::<Value, _>("/x", Some(&bad), RequestOptions::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::SerializationError(_)));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn exactly_one_attempt_per_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let counter = Plugin::new("counter").on_will_send(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let transport = StubTransport::replying(503, json!({}));
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        let mut plugins = vec![counter];
        plugins.extend(default_plugins(store));
        let provider = provider(Arc::clone(&transport), plugins);

        let err = provider.get::<Value>("/x", RequestOptions::new()).await.unwrap_err();
        assert_eq!(err.http_status(), Some(503));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn transport_choice_reaches_transport() {
        let transport = StubTransport::replying(200, json!({}));
        let provider = provider(Arc::clone(&transport), Vec::new());

        let _: Value = provider
            .get("/x", RequestOptions::new().transport(TransportChoice::Fetch))
            .await
            .unwrap();
        assert_eq!(transport.sent()[0].transport, TransportChoice::Fetch);
    }

    #[test]
    fn describe_is_idempotent() {
        let provider = provider(StubTransport::replying(200, json!({})), Vec::new());
        let first = provider.describe(HttpMethod::Get, "/foo", None::<&Value>, RequestOptions::new()).unwrap();
        let second = provider.describe(HttpMethod::Get, "/foo", None::<&Value>, RequestOptions::new()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn build_rejects_invalid_config() {
        let err = Provider::builder(ProviderConfig::new("ftp://example.com")).build().unwrap_err();
        assert!(matches!(err, ApiError::ConfigError(_)));
    }

    #[test]
    fn timeout_is_carried_from_config() {
        let provider = Provider::builder(ProviderConfig::new(BASE_URL).with_timeout_ms(1234))
            .transport(StubTransport::replying(200, json!({})))
            .build()
            .unwrap();
        assert_eq!(provider.timeout(), Duration::from_millis(1234));
        assert_eq!(provider.base_url(), BASE_URL);
    }
}
