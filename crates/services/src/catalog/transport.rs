use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::FetchError;

/// The single HTTP seam of the catalog client: GET an endpoint, get JSON back.
///
/// Implementations return the decoded body even for non-2xx responses so the
/// fetcher can read the API's error envelope.
#[async_trait]
pub trait CatalogTransport: Send + Sync {
    /// # Errors
    ///
    /// Returns `FetchError::Network` when the request cannot be completed or the body
    /// is not JSON.
    async fn get_json(&self, endpoint: &str, params: &[(&str, String)])
    -> Result<Value, FetchError>;
}

#[derive(Clone)]
pub struct HttpCatalogTransport {
    client: Client,
    base_url: String,
}

impl HttpCatalogTransport {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl CatalogTransport for HttpCatalogTransport {
    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Value, FetchError> {
        let url = format!("{}/{endpoint}", self.base_url.trim_end_matches('/'));
        let response = self.client.get(url).query(params).send().await?;
        let status = response.status();
        response.json::<Value>().await.map_err(|err| {
            FetchError::Network(format!("{endpoint} returned {status} with unreadable body: {err}"))
        })
    }
}

/// A request seen by `ScriptedTransport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub endpoint: String,
    pub params: Vec<(String, String)>,
}

impl RecordedRequest {
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<Result<Value, FetchError>>,
    requests: Vec<RecordedRequest>,
}

/// Offline transport that replays queued responses in order and records every
/// request, for tests and demos without network access.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON body for the next request.
    pub fn push_json(&self, body: Value) {
        if let Ok(mut script) = self.script.lock() {
            script.responses.push_back(Ok(body));
        }
    }

    /// Queue a transport failure for the next request.
    pub fn push_failure(&self, err: FetchError) {
        if let Ok(mut script) = self.script.lock() {
            script.responses.push_back(Err(err));
        }
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script
            .lock()
            .map(|script| script.requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CatalogTransport for ScriptedTransport {
    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Value, FetchError> {
        let mut script = self
            .script
            .lock()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        script.requests.push(RecordedRequest {
            endpoint: endpoint.to_owned(),
            params: params
                .iter()
                .map(|(k, v)| ((*k).to_owned(), v.clone()))
                .collect(),
        });
        script
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Network(format!("no scripted response for {endpoint}"))))
    }
}
