//! API client for the remote catalog REST API.
//!
//! `CatalogApi` is the seam the controllers talk to; `ApiClient` is the
//! reqwest-backed implementation. Requests are never retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::cookie::Jar;
use reqwest::{header, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{Product, ProductPage};

use super::{ApiError, ApiResult};

/// Operator login credentials.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Token issued by a successful signin.
#[derive(Debug, Clone)]
pub struct SigninGrant {
    pub token: String,
    /// Server-side expiry, when the server reports one.
    pub server_expiry: Option<DateTime<Utc>>,
}

/// Remote calls used by the console. Every authenticated call takes the
/// bearer token explicitly.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn signin(&self, credentials: &Credentials) -> ApiResult<SigninGrant>;

    async fn check_session(&self, token: &str) -> ApiResult<()>;

    async fn logout(&self, token: &str) -> ApiResult<()>;

    async fn list_products(&self, token: &str, page: u32) -> ApiResult<ProductPage>;

    async fn create_product(&self, token: &str, product: &Product) -> ApiResult<()>;

    async fn update_product(&self, token: &str, id: &str, product: &Product) -> ApiResult<()>;

    async fn delete_product(&self, token: &str, id: &str) -> ApiResult<()>;
}

#[derive(Debug, Deserialize)]
struct SigninResponse {
    token: String,
    /// Expiry in epoch milliseconds
    #[serde(default)]
    expired: Option<i64>,
}

/// Body of create/update requests.
#[derive(Debug, Serialize)]
struct DataEnvelope<'a> {
    data: &'a Product,
}

/// Generic `{success, message}` acknowledgement.
#[derive(Debug, Deserialize)]
struct Ack {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    message: Option<serde_json::Value>,
}

fn default_success() -> bool {
    true
}

/// Settings for building an [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub api_path: String,
    pub timeout: Duration,
}

/// API client for the catalog service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_path: String,
}

impl ApiClient {
    /// Create a new API client that shares `cookies` with the session store.
    pub fn new(settings: &ApiSettings, cookies: Arc<Jar>) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .cookie_provider(cookies)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_path: settings.api_path.trim_matches('/').to_string(),
        })
    }

    fn admin_url(&self, resource: &str) -> String {
        format!("{}/api/{}/admin/{}", self.base_url, self.api_path, resource)
    }

    fn auth_headers(token: &str) -> ApiResult<header::HeaderMap> {
        if token.is_empty() {
            return Err(ApiError::Unauthenticated);
        }
        let mut headers = header::HeaderMap::new();
        let value = header::HeaderValue::from_str(token).map_err(|_| {
            warn!("Stored token is not a valid header value");
            ApiError::Unauthenticated
        })?;
        headers.insert(header::AUTHORIZATION, value);
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> ApiResult<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder, what: &str) -> ApiResult<T> {
        let response = Self::check_response(request.send().await?).await?;
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", what, e)))
    }

    /// Send a request whose reply is a plain acknowledgement.
    async fn send_ack(request: RequestBuilder, what: &str) -> ApiResult<()> {
        let ack: Ack = Self::send_json(request, what).await?;
        if ack.success {
            Ok(())
        } else {
            let message = ack
                .message
                .as_ref()
                .and_then(ApiError::message_text)
                .unwrap_or_else(|| format!("{} failed", what));
            Err(ApiError::Validation(message))
        }
    }
}

#[async_trait]
impl CatalogApi for ApiClient {
    async fn signin(&self, credentials: &Credentials) -> ApiResult<SigninGrant> {
        let url = format!("{}/admin/signin", self.base_url);
        debug!(username = %credentials.username, "Signing in");

        let result: ApiResult<SigninResponse> =
            Self::send_json(self.client.post(&url).json(credentials), "signin").await;

        match result {
            Ok(response) => Ok(SigninGrant {
                token: response.token,
                server_expiry: response.expired.and_then(DateTime::<Utc>::from_timestamp_millis),
            }),
            Err(ApiError::Validation(m)) | Err(ApiError::NotFound(m)) | Err(ApiError::AccessDenied(m)) => {
                Err(ApiError::InvalidCredentials(m))
            }
            Err(ApiError::Unauthenticated) => {
                Err(ApiError::InvalidCredentials("signin rejected".to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn check_session(&self, token: &str) -> ApiResult<()> {
        let url = format!("{}/api/user/check", self.base_url);
        let request = self.client.post(&url).headers(Self::auth_headers(token)?);

        match Self::send_ack(request, "session check").await {
            // A rejected check means the token is no good
            Err(ApiError::Validation(_)) => Err(ApiError::Unauthenticated),
            other => other,
        }
    }

    async fn logout(&self, token: &str) -> ApiResult<()> {
        let url = format!("{}/logout", self.base_url);
        let request = self.client.post(&url).headers(Self::auth_headers(token)?);
        Self::send_ack(request, "logout").await
    }

    async fn list_products(&self, token: &str, page: u32) -> ApiResult<ProductPage> {
        let url = self.admin_url("products");
        debug!(page, "Fetching product page");
        let request = self
            .client
            .get(&url)
            .headers(Self::auth_headers(token)?)
            .query(&[("page", page)]);
        Self::send_json(request, "product listing").await
    }

    async fn create_product(&self, token: &str, product: &Product) -> ApiResult<()> {
        let url = self.admin_url("product");
        let payload = product.without_id();
        let request = self
            .client
            .post(&url)
            .headers(Self::auth_headers(token)?)
            .json(&DataEnvelope { data: &payload });
        Self::send_ack(request, "create product").await
    }

    async fn update_product(&self, token: &str, id: &str, product: &Product) -> ApiResult<()> {
        let url = self.admin_url(&format!("product/{}", id));
        let request = self
            .client
            .put(&url)
            .headers(Self::auth_headers(token)?)
            .json(&DataEnvelope { data: product });
        Self::send_ack(request, "update product").await
    }

    async fn delete_product(&self, token: &str, id: &str) -> ApiResult<()> {
        let url = self.admin_url(&format!("product/{}", id));
        let request = self.client.delete(&url).headers(Self::auth_headers(token)?);
        Self::send_ack(request, "delete product").await
    }
}
