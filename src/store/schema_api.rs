use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::models::Field;
use crate::store::SchemaSource;

const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Deserialize)]
struct OptionsResponse {
    options: Vec<String>,
}

/// HTTP client for the external schema database: one GET per field, bearer
/// auth, minimum spacing between requests.
pub struct ApiSchemaSource {
    client: Client,
    base_url: String,
    token: String,
    database_id: String,
    last_request: Mutex<Option<Instant>>,
}

impl ApiSchemaSource {
    pub fn new(base_url: &str, token: &str, database_id: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            database_id: database_id.to_string(),
            last_request: Mutex::new(None),
        }
    }

    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl SchemaSource for ApiSchemaSource {
    async fn options(&self, field: Field) -> Result<Vec<String>> {
        self.rate_limit().await;

        let url = format!(
            "{}/databases/{}/fields/{}/options",
            self.base_url, self.database_id, field
        );

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("schema request for {} failed", field))?;

        if !resp.status().is_success() {
            return Err(anyhow!(
                "schema request for {} returned {}",
                field,
                resp.status()
            ));
        }

        let body: OptionsResponse = resp
            .json()
            .await
            .with_context(|| format!("malformed schema response for {}", field))?;
        Ok(body.options)
    }

    fn identity(&self) -> String {
        self.database_id.clone()
    }
}

/// In-process schema source for tests and for running without an external
/// schema database configured.
#[derive(Debug, Default)]
pub struct StaticSchemaSource {
    options: HashMap<Field, Vec<String>>,
}

impl StaticSchemaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, options: &[&str]) -> Self {
        self.options
            .insert(field, options.iter().map(|s| s.to_string()).collect());
        self
    }
}

#[async_trait]
impl SchemaSource for StaticSchemaSource {
    async fn options(&self, field: Field) -> Result<Vec<String>> {
        Ok(self.options.get(&field).cloned().unwrap_or_default())
    }

    fn identity(&self) -> String {
        "static".to_string()
    }
}
