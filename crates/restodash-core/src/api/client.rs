//! REST client for the hosted restaurant backend.
//!
//! Authentication goes through the identity toolkit endpoint; records live
//! under `{base}/restaurants/{restaurant_id}/{collection}`. The client
//! implements every storage collaborator trait plus `AuthProvider`.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::ApiError;
use crate::auth::{AuthError, AuthProvider, Identity};
use crate::models::{NewStaffMember, StaffMember, StaffUpdate};
use crate::store::{Document, EntityStore, StaffDirectory, StoreError, StoreResult};

/// Default identity toolkit endpoint
pub const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    local_id: String,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    error: AuthErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AuthErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: String,
}

/// API client for the restaurant backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling,
/// and clones share the bearer token.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    restaurant_id: String,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: &str, api_key: &str, restaurant_id: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            restaurant_id: restaurant_id.to_string(),
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn set_token(&self, token: Option<String>) {
        let mut guard = self.token.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = token;
    }

    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = self.token() {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::InvalidResponse(format!("Invalid token header: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/restaurants/{}/{}", self.base_url, self.restaurant_id, collection)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.collection_url(collection), id)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn read_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", url, e)))
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        debug!(url = url, "GET");
        let response = self.client.get(url).headers(self.auth_headers()?).send().await?;
        let response = Self::check_response(response).await?;
        Self::read_json(response, url).await
    }

    /// GET that maps 404 to `None`.
    async fn get_optional<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, ApiError> {
        match self.get(url).await {
            Ok(value) => Ok(Some(value)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(url = url, method = %method, "Sending");
        let response = self
            .client
            .request(method, url)
            .headers(self.auth_headers()?)
            .json(body)
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        Self::read_json(response, url).await
    }

    async fn delete_url(&self, url: &str) -> Result<(), ApiError> {
        debug!(url = url, "DELETE");
        let response = self.client.delete(url).headers(self.auth_headers()?).send().await?;
        Self::check_response(response).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for ApiClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let url = format!("{}/accounts:signInWithPassword", DEFAULT_AUTH_URL);
        let body = SignInRequest {
            email,
            password,
            return_secure_token: true,
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !status.is_success() {
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(AuthError::TooManyAttempts);
            }
            if status.is_server_error() {
                return Err(AuthError::Network(format!("identity service returned {}", status)));
            }
            let code = serde_json::from_str::<AuthErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or_default();
            warn!(status = %status, code = %code, "Sign-in rejected");
            return Err(AuthError::from_code(&code, email));
        }

        let parsed: SignInResponse = serde_json::from_str(&text)
            .map_err(|e| AuthError::Network(format!("Unexpected sign-in response: {}", e)))?;
        self.set_token(Some(parsed.id_token.clone()));

        Ok(Identity {
            uid: parsed.local_id,
            email: parsed.email,
            display_name: parsed.display_name,
            token: parsed.id_token,
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        // Identity tokens are stateless; forgetting ours is the sign-out
        self.set_token(None);
        Ok(())
    }
}

#[async_trait]
impl<T: Document + 'static> EntityStore<T> for ApiClient {
    async fn list(&self) -> StoreResult<Vec<T>> {
        Ok(self.get(&self.collection_url(T::COLLECTION)).await?)
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<T>> {
        Ok(self.get_optional(&self.document_url(T::COLLECTION, id)).await?)
    }

    async fn create(&self, record: T) -> StoreResult<String> {
        let created: CreatedResponse = self
            .send_json(reqwest::Method::POST, &self.collection_url(T::COLLECTION), &record)
            .await?;
        Ok(created.id)
    }
}

#[async_trait]
impl StaffDirectory for ApiClient {
    async fn get_by_email(&self, email: &str) -> StoreResult<Option<StaffMember>> {
        let url = self.collection_url(StaffMember::COLLECTION);
        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .query(&[("email", email)])
            .send()
            .await
            .map_err(ApiError::from)?;
        let response = Self::check_response(response).await?;
        let matches: Vec<StaffMember> = Self::read_json(response, &url).await?;
        Ok(matches.into_iter().next())
    }

    async fn create(&self, member: NewStaffMember) -> StoreResult<StaffMember> {
        if self.get_by_email(&member.email).await?.is_some() {
            return Err(StoreError::Conflict(member.email));
        }
        let record = StaffMember::from_new(String::new(), member, Utc::now());
        let id = EntityStore::<StaffMember>::create(self, record.clone()).await?;
        Ok(record.with_id(id))
    }

    async fn update(&self, id: &str, update: StaffUpdate) -> StoreResult<StaffMember> {
        let url = self.document_url(StaffMember::COLLECTION, id);
        let mut patch = serde_json::to_value(&update)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        if let Some(fields) = patch.as_object_mut() {
            fields.insert("updatedAt".to_string(), serde_json::json!(Utc::now()));
        }
        match self.send_json(reqwest::Method::PATCH, &url, &patch).await {
            Ok(member) => Ok(member),
            Err(ApiError::NotFound(_)) => Err(StoreError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        match self.delete_url(&self.document_url(StaffMember::COLLECTION, id)).await {
            Ok(()) => Ok(()),
            Err(ApiError::NotFound(_)) => Err(StoreError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_all(&self) -> StoreResult<Vec<StaffMember>> {
        EntityStore::<StaffMember>::list(self).await
    }
}
