//! Management API client
//!
//! [`ProxyHostApi`] is the seam between the reconciler and the network.
//! [`HttpApi`] talks to a real server over HTTP+JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::ServerCredential;
use crate::error::{Result, SyncError};
use crate::record::{HostId, ProxyHost};

/// Authenticated connection to one server, valid for one cycle
#[derive(Debug, Clone)]
pub struct Session {
    /// Base address the token was issued by
    pub address: String,
    /// Bearer token
    pub token: String,
}

impl Session {
    pub fn new(address: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address.trim_end_matches('/'), path)
    }
}

/// Operations the sync needs from a management API
#[async_trait::async_trait]
pub trait ProxyHostApi: Send + Sync {
    /// Exchange credentials for a bearer token
    async fn login(&self, server: &ServerCredential) -> Result<Session>;

    /// Fetch every proxy host in a single request
    async fn list_hosts(&self, session: &Session) -> Result<Vec<ProxyHost>>;

    /// Remove one proxy host
    async fn delete_host(&self, session: &Session, id: &HostId) -> Result<()>;

    /// Create a proxy host from a field projection
    async fn create_host(&self, session: &Session, payload: &Map<String, Value>) -> Result<()>;
}

/// Token request body
#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    identity: &'a str,
    secret: &'a str,
}

/// Token response body
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// HTTP implementation of [`ProxyHostApi`]
pub struct HttpApi {
    client: reqwest::Client,
}

impl HttpApi {
    /// Create a client with the given per-request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl ProxyHostApi for HttpApi {
    async fn login(&self, server: &ServerCredential) -> Result<Session> {
        let url = format!("{}/api/tokens", server.base_url());
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&TokenRequest {
                identity: &server.username,
                secret: &server.password,
            })
            .send()
            .await
            .map_err(|e| SyncError::Authentication {
                address: server.address.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Authentication {
                address: server.address.clone(),
                reason: format!("HTTP {} {}", status.as_u16(), body),
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| SyncError::InvalidResponse {
            url,
            reason: e.to_string(),
        })?;

        Ok(Session::new(server.base_url(), token.token))
    }

    async fn list_hosts(&self, session: &Session) -> Result<Vec<ProxyHost>> {
        let url = session.url("/api/nginx/proxy-hosts");
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&session.token)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(SyncError::UnexpectedStatus {
                operation: "list proxy hosts",
                url,
                status: status.as_u16(),
            });
        }

        response
            .json::<Vec<ProxyHost>>()
            .await
            .map_err(|e| SyncError::InvalidResponse {
                url,
                reason: e.to_string(),
            })
    }

    async fn delete_host(&self, session: &Session, id: &HostId) -> Result<()> {
        let url = session.url(&format!("/api/nginx/proxy-hosts/{}", id));
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&session.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::UnexpectedStatus {
                operation: "delete proxy host",
                url,
                status: status.as_u16(),
            });
        }

        Ok(())
    }

    async fn create_host(&self, session: &Session, payload: &Map<String, Value>) -> Result<()> {
        let url = session.url("/api/nginx/proxy-hosts");
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&session.token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            debug!("Create rejected by {}: {}", url, body);
            return Err(SyncError::UnexpectedStatus {
                operation: "create proxy host",
                url,
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}
