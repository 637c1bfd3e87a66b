use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::catalog::{CatalogDoc, CatalogLookup};
use crate::config::CatalogConfig;
use crate::utils::{ShelfError, ShelfResult};

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<CatalogDoc>,
}

/// Client for the Open Library `search.json` endpoint.
pub struct OpenLibraryClient {
    client: Client,
    base_url: String,
}

impl OpenLibraryClient {
    pub fn new(config: &CatalogConfig) -> ShelfResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self) -> String {
        format!("{}/search.json", self.base_url)
    }
}

#[async_trait]
impl CatalogLookup for OpenLibraryClient {
    async fn search(&self, query: &str) -> ShelfResult<Vec<CatalogDoc>> {
        let url = self.search_url();
        info!("searching Open Library: {} q={}", url, query);

        let response = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?;

        let text = response.text().await?;
        debug!("Open Library response: {} bytes", text.len());

        let docs = parse_search_response(&text)?;
        info!("Open Library returned {} docs", docs.len());
        Ok(docs)
    }
}

fn parse_search_response(body: &str) -> ShelfResult<Vec<CatalogDoc>> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| ShelfError::ParseError(format!("Open Library search response: {}", e)))?;
    Ok(response.docs)
}
