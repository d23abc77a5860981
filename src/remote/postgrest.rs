use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::debug;

use crate::config::RemoteConfig;
use crate::core::{EntityRecord, Result, TrackerError};

use super::{RemoteRecord, RemoteStore, UPSERT_CONFLICT_KEY};

/// HTTP client for a PostgREST (Supabase) table.
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    client: Client,
    table_url: String,
    api_key: String,
}

impl PostgrestStore {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            table_url: format!("{}/rest/v1/{}", config.url.trim_end_matches('/'), config.table),
            api_key: config.api_key.clone(),
        })
    }

    pub fn table_url(&self) -> &str {
        &self.table_url
    }

    async fn check(response: Response, action: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TrackerError::Remote(format!("{action} returned {status}: {body}")))
    }
}

#[async_trait]
impl RemoteStore for PostgrestStore {
    async fn fetch_group(&self, group: &str) -> Result<Vec<EntityRecord>> {
        let response = self
            .client
            .get(&self.table_url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[("select", "*".to_string()), ("group_name", format!("eq.{group}"))])
            .send()
            .await?;

        let rows: Vec<RemoteRecord> = Self::check(response, "fetch").await?.json().await?;
        debug!(group = %group, rows = rows.len(), "fetched remote rows");
        Ok(rows.iter().map(RemoteRecord::to_entity).collect())
    }

    async fn upsert_records(&self, records: &[RemoteRecord]) -> Result<()> {
        let response = self
            .client
            .post(&self.table_url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .query(&[("on_conflict", UPSERT_CONFLICT_KEY)])
            .json(records)
            .send()
            .await?;

        Self::check(response, "upsert").await?;
        Ok(())
    }
}
