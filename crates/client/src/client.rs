//! The authenticated request pipeline.
//!
//! Builds one HTTP call with the current credentials and locale header,
//! classifies the response, and performs at most one transparent retry after
//! a token refresh. Everything the verb helpers send funnels through
//! [`ApiClient::request`].

use crate::credentials::CredentialStore;
use crate::options::{FileUpload, RequestBody, RequestOptions};
use crate::refresh::RefreshCoordinator;
use huddle_types::{
    HuddleError, KeyValueStore, LanguageProvider, SessionExpiredHandler, StaticLanguage,
    traits::Result,
};
use reqwest::{Method, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_LOCALE: &str = "en";
const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);
const REFRESH_ENDPOINT: &str = "/auth/refresh";

/// Shared HTTP client for all authenticated API calls.
///
/// Cheap to clone: every clone shares the same credential store and refresh
/// coordinator, so concurrent callers anywhere in the app contend on a
/// single token refresh instead of racing each other.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    credentials: CredentialStore,
    refresh: RefreshCoordinator,
    language: Arc<dyn LanguageProvider>,
}

impl ApiClient {
    /// Starts building a client for the given API base URL and storage
    /// backend.
    pub fn builder(base_url: impl Into<String>, storage: Arc<dyn KeyValueStore>) -> ApiClientBuilder {
        ApiClientBuilder {
            base_url: base_url.into(),
            storage,
            language: None,
            on_session_expired: None,
            http: None,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            request_timeout: None,
        }
    }

    /// The configured API base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    // ── Verb helpers ──────────────────────────────────────────────────────

    /// `GET` the endpoint and deserialize the JSON response.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.request(Method::GET, endpoint, RequestBody::Empty, RequestOptions::new())
            .await
    }

    /// `POST` a JSON body and deserialize the response.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(
            Method::POST,
            endpoint,
            RequestBody::Json(serde_json::to_value(body)?),
            RequestOptions::new(),
        )
        .await
    }

    /// `PUT` a JSON body and deserialize the response.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn put<T, B>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(
            Method::PUT,
            endpoint,
            RequestBody::Json(serde_json::to_value(body)?),
            RequestOptions::new(),
        )
        .await
    }

    /// `PATCH` a JSON body and deserialize the response.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn patch<T, B>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(
            Method::PATCH,
            endpoint,
            RequestBody::Json(serde_json::to_value(body)?),
            RequestOptions::new(),
        )
        .await
    }

    /// `DELETE` the endpoint and deserialize the JSON response (empty bodies
    /// deserialize as JSON `null`).
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.request(Method::DELETE, endpoint, RequestBody::Empty, RequestOptions::new())
            .await
    }

    /// `POST` a multipart file upload. The form's `Content-Type` (with its
    /// boundary) is preserved; no JSON content type is forced onto it.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn upload_file<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        upload: FileUpload,
    ) -> Result<T> {
        self.request(
            Method::POST,
            endpoint,
            RequestBody::Multipart(upload),
            RequestOptions::new(),
        )
        .await
    }

    // ── Session mutators (login/logout flows) ─────────────────────────────

    /// Store the access token attached to subsequent requests.
    pub async fn set_auth_token(&self, token: &str) {
        self.inner.credentials.set_access_token(token).await;
    }

    /// Drop the stored access token.
    pub async fn clear_auth_token(&self) {
        self.inner.credentials.clear_access_token().await;
    }

    /// Store the refresh token used by the refresh exchange.
    pub async fn set_refresh_token(&self, token: &str) {
        self.inner.credentials.set_refresh_token(token).await;
    }

    /// Drop the stored refresh token.
    pub async fn clear_refresh_token(&self) {
        self.inner.credentials.clear_refresh_token().await;
    }

    // ── Executor ──────────────────────────────────────────────────────────

    /// Perform one logical call: send, and on a first-attempt 401 refresh the
    /// token and resend the identical request exactly once.
    ///
    /// # Errors
    ///
    /// - [`HuddleError::Network`] — transport failure, no HTTP status.
    /// - [`HuddleError::Api`] — non-2xx response (including a 401 on the
    ///   retry), with the status and the error body's `message` field or a
    ///   generic fallback.
    /// - [`HuddleError::SessionExpired`] — a 401 whose refresh attempt
    ///   failed; the session-expiry hook has already fired.
    /// - [`HuddleError::Serialization`] — the success body is not valid JSON
    ///   for `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: RequestBody,
        options: RequestOptions,
    ) -> Result<T> {
        let response = self.send_once(&method, endpoint, &body, &options).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            if self.inner.refresh.acquire_valid_token().await.is_err() {
                return Err(HuddleError::SessionExpired);
            }
            tracing::debug!(%method, endpoint, "retrying once with refreshed token");
            let retried = self.send_once(&method, endpoint, &body, &options).await?;
            // The retry's outcome is final: a second 401 surfaces as a plain
            // API error, never another refresh.
            return Self::into_result(retried).await;
        }
        Self::into_result(response).await
    }

    async fn send_once(
        &self,
        method: &Method,
        endpoint: &str,
        body: &RequestBody,
        options: &RequestOptions,
    ) -> Result<reqwest::Response> {
        let url = join_url(&self.inner.base_url, endpoint);
        let mut builder = self
            .inner
            .http
            .request(method.clone(), url)
            .header(header::ACCEPT_LANGUAGE, self.inner.language.language());
        if let Some(token) = self.inner.credentials.access_token().await {
            builder = builder.bearer_auth(token);
        }
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(upload) => builder.multipart(upload.to_form()?),
        };
        if !options.headers.is_empty() {
            builder = builder.headers(options.headers.clone());
        }
        Ok(builder.send().await?)
    }

    async fn into_result<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.bytes().await?;
        if status.is_success() {
            if body.is_empty() {
                // 204-style responses deserialize as JSON null.
                Ok(serde_json::from_slice(b"null")?)
            } else {
                Ok(serde_json::from_slice(&body)?)
            }
        } else {
            Err(HuddleError::Api {
                status: status.as_u16(),
                message: error_message(status, &body),
            })
        }
    }
}

/// Builder for [`ApiClient`]; all dependencies are injected here.
pub struct ApiClientBuilder {
    base_url: String,
    storage: Arc<dyn KeyValueStore>,
    language: Option<Arc<dyn LanguageProvider>>,
    on_session_expired: Option<Arc<dyn SessionExpiredHandler>>,
    http: Option<reqwest::Client>,
    refresh_timeout: Duration,
    request_timeout: Option<Duration>,
}

impl ApiClientBuilder {
    /// Locale source for the `Accept-Language` header (default: fixed `"en"`).
    #[must_use]
    pub fn language_provider(mut self, provider: Arc<dyn LanguageProvider>) -> Self {
        self.language = Some(provider);
        self
    }

    /// Hook invoked when a token refresh definitively fails.
    #[must_use]
    pub fn on_session_expired(mut self, handler: Arc<dyn SessionExpiredHandler>) -> Self {
        self.on_session_expired = Some(handler);
        self
    }

    /// Use a pre-configured `reqwest` client instead of the default.
    #[must_use]
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Cap on one refresh exchange (default 30 s). A timeout resolves the
    /// cycle with a uniform failure for all waiters instead of leaving the
    /// coordinator stuck.
    #[must_use]
    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Overall timeout applied to each HTTP attempt. Ignored when a custom
    /// client is supplied via [`ApiClientBuilder::http_client`].
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`HuddleError::InvalidRequest`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn build(self) -> Result<ApiClient> {
        let http = match self.http {
            Some(http) => http,
            None => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = self.request_timeout {
                    builder = builder.timeout(timeout);
                }
                builder.build().map_err(|e| {
                    HuddleError::InvalidRequest(format!("failed to build http client: {e}"))
                })?
            }
        };

        let base_url = self.base_url.trim_end_matches('/').to_string();
        let credentials = CredentialStore::new(self.storage);
        let refresh = RefreshCoordinator::new(
            http.clone(),
            format!("{base_url}{REFRESH_ENDPOINT}"),
            credentials.clone(),
            self.on_session_expired,
            self.refresh_timeout,
        );
        let language = self
            .language
            .unwrap_or_else(|| Arc::new(StaticLanguage::new(DEFAULT_LOCALE)));

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                credentials,
                refresh,
                language,
            }),
        })
    }
}

fn join_url(base: &str, endpoint: &str) -> String {
    if endpoint.starts_with('/') {
        format!("{base}{endpoint}")
    } else {
        format!("{base}/{endpoint}")
    }
}

/// Extract the `message` field from a JSON error body, falling back to a
/// generic status line when the body is missing, malformed, or silent.
pub(crate) fn error_message(status: StatusCode, body: &[u8]) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        message: Option<String>,
    }

    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()))
}
