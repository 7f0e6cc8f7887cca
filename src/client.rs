use crate::constants;
use crate::writer::EncodedBody;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

/// A status and body received from a remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl RemoteResponse {
    pub fn new<B: Into<Bytes>>(status: StatusCode, body: B) -> RemoteResponse {
        RemoteResponse {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The body as JSON. A body that is not JSON comes back wrapped as
    /// `{"rawText": ...}`.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|_| json!({ "rawText": String::from_utf8_lossy(&self.body) }))
    }
}

/// The remote calls an upload needs. [`Uploader`](crate::Uploader) and the
/// checks in [`verify`](crate::verify) are generic over it, so tests can drive
/// them without a network.
#[async_trait]
pub trait AssetApi: Send + Sync {
    /// `POST /assets/v1/assets` with the encoded multipart body.
    async fn create_asset(&self, api_key: &str, body: EncodedBody) -> crate::Result<RemoteResponse>;

    /// `GET /assets/v1/{path}` for an operation handle.
    async fn get_operation(&self, api_key: &str, path: &str) -> crate::Result<RemoteResponse>;

    /// `GET /assets/v1/assets` only to see how the key is answered.
    async fn probe_api_key(&self, api_key: &str) -> crate::Result<RemoteResponse>;

    /// `GET /v1/users/{id}` on the users service.
    async fn get_user(&self, user_id: &str) -> crate::Result<RemoteResponse>;
}

/// [`AssetApi`] over HTTPS with a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct RemoteApi {
    client: reqwest::Client,
    api_base: String,
    users_base: String,
}

impl RemoteApi {
    pub fn new<A: Into<String>, U: Into<String>>(api_base: A, users_base: U, timeout: Duration) -> crate::Result<RemoteApi> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| crate::Error::Server(format!("failed to build HTTP client: {}", err)))?;

        Ok(RemoteApi {
            client,
            api_base: api_base.into().trim_end_matches('/').to_owned(),
            users_base: users_base.into().trim_end_matches('/').to_owned(),
        })
    }

    fn assets_url(&self) -> String {
        format!("{}{}", self.api_base, constants::ASSETS_PATH)
    }

    fn operation_url(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.api_base,
            constants::OPERATIONS_PREFIX,
            path.trim_start_matches('/')
        )
    }

    fn user_url(&self, user_id: &str) -> String {
        format!("{}/v1/users/{}", self.users_base, user_id)
    }
}

async fn read_response(response: reqwest::Response) -> crate::Result<RemoteResponse> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|err| crate::Error::Transport(err.into()))?;

    Ok(RemoteResponse { status, body })
}

#[async_trait]
impl AssetApi for RemoteApi {
    async fn create_asset(&self, api_key: &str, body: EncodedBody) -> crate::Result<RemoteResponse> {
        let response = self
            .client
            .post(self.assets_url())
            .header(constants::API_KEY_HEADER, api_key)
            .header(CONTENT_TYPE, body.content_type())
            .body(body.bytes)
            .send()
            .await
            .map_err(|err| crate::Error::Transport(err.into()))?;

        read_response(response).await
    }

    async fn get_operation(&self, api_key: &str, path: &str) -> crate::Result<RemoteResponse> {
        let response = self
            .client
            .get(self.operation_url(path))
            .header(constants::API_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(|err| crate::Error::Transport(err.into()))?;

        read_response(response).await
    }

    async fn probe_api_key(&self, api_key: &str) -> crate::Result<RemoteResponse> {
        let response = self
            .client
            .get(self.assets_url())
            .header(constants::API_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(|err| crate::Error::Transport(err.into()))?;

        read_response(response).await
    }

    async fn get_user(&self, user_id: &str) -> crate::Result<RemoteResponse> {
        let response = self
            .client
            .get(self.user_url(user_id))
            .send()
            .await
            .map_err(|err| crate::Error::Transport(err.into()))?;

        read_response(response).await
    }
}
