//! `reqwest` implementation of the filter backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use anitools_core::{
    BackendNotice, BackendReply, EntityType, Error, FilterBackend, FilterValues, Result,
    SearchPage, SearchRequest, TypeaheadSource, UserList, WhitelistEntry,
};

use crate::config::BackendConfig;

/// HTTP filter backend.
pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
}

/// Shapes the backend uses for error bodies.
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Notices { error: Vec<BackendNotice> },
    Message { message: String },
    Detail { detail: String },
}

impl ErrorBody {
    fn into_message(self) -> String {
        match self {
            ErrorBody::Notices { error } => error
                .into_iter()
                .map(|n| n.message)
                .collect::<Vec<_>>()
                .join("; "),
            ErrorBody::Message { message } => message,
            ErrorBody::Detail { detail } => detail,
        }
    }
}

impl HttpBackend {
    /// Create a backend from a validated configuration.
    pub fn new(config: BackendConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing HTTP filter backend: url={}, timeout={}s",
            config.base_url, config.timeout_secs
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(BackendConfig::from_env())
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.config.access_token {
            Some(ref token) => req.header("Authorization", format!("Bearer {}", token)),
            None => req,
        }
    }

    fn build_get_request(&self, endpoint: &str) -> RequestBuilder {
        self.authorize(self.client.get(self.config.url(endpoint)))
    }

    fn build_post_request(&self, endpoint: &str) -> RequestBuilder {
        self.authorize(self.client.post(self.config.url(endpoint)))
            .header("Content-Type", "application/json")
    }

    /// Decode a success body, or turn a failure status into [`Error::Backend`].
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| Error::Serialization(format!("Failed to parse response: {}", e)));
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => parsed.into_message(),
            Err(_) if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
            Err(_) => body.trim().to_string(),
        };
        warn!(status = status.as_u16(), error = %message, "Backend request failed");
        Err(Error::Backend {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl FilterBackend for HttpBackend {
    #[instrument(skip_all, fields(component = "http_backend", op = "filter_values", entity_type = %entity_type))]
    async fn filter_values(&self, entity_type: EntityType) -> Result<FilterValues> {
        let start = Instant::now();
        let response = self
            .build_get_request("/filterValues")
            .query(&[("media_type", entity_type.as_str())])
            .send()
            .await?;
        let values: FilterValues = Self::handle_response(response).await?;
        debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Fetched filter values"
        );
        Ok(values)
    }

    #[instrument(skip_all, fields(component = "http_backend", op = "typeahead", endpoint = source.path(), query_len = query.len()))]
    async fn suggest(&self, source: TypeaheadSource, query: &str) -> Result<Vec<WhitelistEntry>> {
        let start = Instant::now();
        let response = self
            .build_get_request(source.path())
            .query(&[("q", query)])
            .send()
            .await?;
        let entries: Vec<WhitelistEntry> = Self::handle_response(response).await?;
        debug!(
            result_count = entries.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Typeahead lookup complete"
        );
        Ok(entries)
    }

    #[instrument(skip_all, fields(component = "http_backend", op = "user_lists", entity_type = %entity_type, force_reload = force_reload))]
    async fn user_lists(
        &self,
        user_name: &str,
        entity_type: EntityType,
        force_reload: bool,
    ) -> Result<BackendReply<Vec<UserList>>> {
        let mut query = vec![
            ("user_name", user_name),
            ("media_type", entity_type.as_str()),
        ];
        if force_reload {
            query.push(("force_reload", "true"));
        }

        let response = self
            .build_get_request("/userLists")
            .query(&query)
            .send()
            .await?;
        let reply: BackendReply<Vec<UserList>> = Self::handle_response(response).await?;
        debug!(
            result_count = reply.data.len(),
            errors = reply.errors.len(),
            warnings = reply.warnings.len(),
            "Fetched user lists"
        );
        Ok(reply)
    }

    #[instrument(skip_all, fields(component = "http_backend", op = "search", draw = request.draw, start = request.start))]
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage> {
        let start = Instant::now();
        let response = self.build_post_request("/").json(request).send().await?;
        let page: SearchPage = Self::handle_response(response).await?;
        debug!(
            result_count = page.data.len(),
            records_filtered = page.records_filtered,
            duration_ms = start.elapsed().as_millis() as u64,
            "Fetched table page"
        );
        Ok(page)
    }
}
