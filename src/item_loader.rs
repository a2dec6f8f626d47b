//! Reads the list of items to watch. One `<id>,<price>` pair per line.

use std::collections::HashSet;
use std::path::Path;
use tracing::warn;
use validator::Validate;

use crate::models::TrackedItem;
use crate::utils::error::AppError;
use crate::Result;

pub async fn load_items(path: impl AsRef<Path>) -> Result<Vec<TrackedItem>> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path).await?;
    let items = parse_items(&text)?;
    tracing::info!("Loaded {} items from {}", items.len(), path.display());
    Ok(items)
}

pub fn parse_items(text: &str) -> Result<Vec<TrackedItem>> {
    let mut items = Vec::new();
    let mut seen = HashSet::new();

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            warn!("Skipping blank line {} in item list", line_no);
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let [id, price] = fields.as_slice() else {
            return Err(AppError::parse(format!(
                "line {}: expected <id>,<price>, got {} field(s)",
                line_no,
                fields.len()
            )));
        };

        let threshold_price: i64 = price
            .parse()
            .map_err(|_| AppError::parse(format!("line {}: invalid price {:?}", line_no, price)))?;
        if threshold_price < 0 {
            return Err(AppError::parse(format!(
                "line {}: price must not be negative",
                line_no
            )));
        }

        let item = TrackedItem::new(*id, threshold_price);
        item.validate()
            .map_err(|e| AppError::parse(format!("line {}: {}", line_no, e)))?;

        if !seen.insert(item.id.clone()) {
            return Err(AppError::parse(format!(
                "line {}: duplicate item id {}",
                line_no, item.id
            )));
        }
        items.push(item);
    }

    Ok(items)
}
