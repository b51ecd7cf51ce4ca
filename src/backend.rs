use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;

use crate::api::models::{ErrorBody, SearchRequest, SearchResponse};
use crate::auth::{Anonymous, AuthProvider, SessionCookie};
use crate::config::Config;
use crate::error::SearchError;

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError>;
}

pub struct HttpSearchBackend {
    client: Client,
    endpoint: Url,
    auth: Arc<dyn AuthProvider>,
    timeout: Duration,
}

impl HttpSearchBackend {
    pub fn new(
        base_url: &str,
        search_path: &str,
        auth: Arc<dyn AuthProvider>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Self::with_client(Client::new(), base_url, search_path, auth, timeout)
    }

    pub fn with_client(
        client: Client,
        base_url: &str,
        search_path: &str,
        auth: Arc<dyn AuthProvider>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let endpoint = Url::parse(base_url)?.join(search_path)?;
        Ok(Self {
            client,
            endpoint,
            auth,
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let auth: Arc<dyn AuthProvider> = match &config.session_cookie {
            Some(cookie) => Arc::new(SessionCookie::new(cookie.clone())),
            None => Arc::new(Anonymous),
        };
        Self::new(
            &config.api_base,
            &config.search_path,
            auth,
            config.request_timeout,
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn error_from_response(status: StatusCode, response: reqwest::Response) -> SearchError {
        if status == StatusCode::UNAUTHORIZED {
            return SearchError::Unauthenticated;
        }
        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => parsed.error,
            Err(_) => body.trim().to_string(),
        };
        SearchError::RequestFailed {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
        log::debug!("POST {} query={:?}", self.endpoint, request.query);
        let builder = self
            .client
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .json(&request);
        let response = self.auth.authorize(builder).send().await?;

        let status = response.status();
        if !status.is_success() {
            let err = Self::error_from_response(status, response).await;
            log::warn!("search backend rejected {:?}: {}", request.query, err);
            return Err(err);
        }

        let parsed = response.json::<SearchResponse>().await?;
        Ok(parsed)
    }
}
