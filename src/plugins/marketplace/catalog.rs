use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};

use super::{cookie_header, join_url};
use crate::models::SampleResult;
use crate::plugins::traits::PriceSource;
use crate::utils::error::AppError;
use crate::Result;

const LISTING_SELECTOR: &str = "[data-expected-price][data-product-id][data-expected-seller-id][data-lowest-private-sale-userasset-id]";

/// Samples an item by scraping the listing attributes off its catalog page.
pub struct CatalogPageSource {
    client: Client,
    base_url: String,
}

impl CatalogPageSource {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }

    fn page_url(&self, item_id: &str) -> String {
        join_url(&self.base_url, &format!("catalog/{}/", item_id))
    }
}

/// Pull the price and listing identifiers out of a catalog page.
pub fn parse_listing(html: &str) -> Result<SampleResult> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(LISTING_SELECTOR)
        .map_err(|e| AppError::parse(format!("Invalid listing selector: {:?}", e)))?;

    let element = document
        .select(&selector)
        .next()
        .ok_or_else(|| AppError::parse("No listing data found on catalog page"))?;

    let attr = |name: &str| -> Result<i64> {
        let raw = element
            .value()
            .attr(name)
            .ok_or_else(|| AppError::parse(format!("Missing attribute {}", name)))?;
        raw.trim()
            .parse::<i64>()
            .map_err(|_| AppError::parse(format!("Attribute {} is not a number: {:?}", name, raw)))
    };

    Ok(SampleResult::new(
        attr("data-expected-price")?,
        attr("data-product-id")?,
        attr("data-expected-seller-id")?,
        attr("data-lowest-private-sale-userasset-id")?,
    ))
}

#[async_trait]
impl PriceSource for CatalogPageSource {
    fn name(&self) -> &str {
        "catalog-page"
    }

    async fn sample(&self, item_id: &str, cookie: &str) -> Result<SampleResult> {
        let response = self
            .client
            .get(self.page_url(item_id))
            .header(reqwest::header::COOKIE, cookie_header(cookie))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::plugin(
                "catalog",
                format!("catalog page for {} returned status {}", item_id, status),
            ));
        }

        let body = response.text().await?;
        parse_listing(&body)
    }
}
