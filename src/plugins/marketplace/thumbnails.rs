use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::join_url;
use crate::plugins::traits::ThumbnailResolver;
use crate::utils::error::AppError;
use crate::Result;

const THUMBNAIL_SIZE: &str = "150x150";
const THUMBNAIL_FORMAT: &str = "webp";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThumbnailRequest {
    request_id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    target_id: String,
    format: &'static str,
    size: &'static str,
}

impl ThumbnailRequest {
    fn asset(item_id: &str) -> Self {
        Self {
            request_id: format!(
                "{}:undefined:Asset:{}:{}:regular",
                item_id, THUMBNAIL_SIZE, THUMBNAIL_FORMAT
            ),
            kind: "Asset",
            target_id: item_id.to_string(),
            format: THUMBNAIL_FORMAT,
            size: THUMBNAIL_SIZE,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    data: Vec<ThumbnailEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThumbnailEntry {
    #[serde(default)]
    image_url: Option<String>,
}

pub struct BatchThumbnailResolver {
    client: Client,
    base_url: String,
}

impl BatchThumbnailResolver {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl ThumbnailResolver for BatchThumbnailResolver {
    async fn resolve(&self, item_id: &str) -> Result<String> {
        let response = self
            .client
            .post(join_url(&self.base_url, "v1/batch"))
            .json(&[ThumbnailRequest::asset(item_id)])
            .send()
            .await?
            .error_for_status()?;

        let batch: BatchResponse = response.json().await?;
        batch
            .data
            .into_iter()
            .next()
            .and_then(|entry| entry.image_url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AppError::NotFound {
                resource: format!("thumbnail for item {}", item_id),
            })
    }
}
