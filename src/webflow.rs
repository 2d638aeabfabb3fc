// Webflow CMS client for the listing sync.
//
// All calls go through the v2 data API with a bearer token. Item bodies are
// raw serde_json maps because the field schema is owned by the collection,
// not by this service.

use crate::config::Settings;
use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::time::{Duration, sleep};

const API_BASE: &str = "https://api.webflow.com/v2";
const PAGE_LIMIT: usize = 100;
const PAGE_DELAY_MS: u64 = 100;

#[derive(Debug, Clone)]
pub struct WebflowClient {
    http: Arc<Client>,
    token: String,
    collection_id: String,
    site_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebflowItem {
    pub id: String,
    #[serde(rename = "fieldData")]
    pub field_data: Option<Value>,
}

impl WebflowItem {
    /// The Hostaway listing id stored on the item, if present.
    pub fn listing_id(&self) -> Option<String> {
        let value = self.field_data.as_ref()?.get("listing-id")?;
        match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ItemsPage {
    items: Option<Vec<WebflowItem>>,
}

#[derive(Debug, Deserialize)]
struct SiteInfo {
    #[serde(rename = "customDomains")]
    custom_domains: Option<Vec<CustomDomain>>,
}

#[derive(Debug, Deserialize)]
struct CustomDomain {
    id: String,
}

impl WebflowClient {
    pub fn from_settings(settings: &Settings, http: Arc<Client>) -> Result<Self> {
        let token = settings
            .webflow_api_token
            .clone()
            .ok_or_else(|| anyhow!("WEBFLOW_API_TOKEN is not configured"))?;
        let collection_id = settings
            .webflow_collection_id
            .clone()
            .ok_or_else(|| anyhow!("WEBFLOW_COLLECTION_ID is not configured"))?;
        let site_id = settings
            .webflow_site_id
            .clone()
            .ok_or_else(|| anyhow!("WEBFLOW_SITE_ID is not configured"))?;
        Ok(WebflowClient {
            http,
            token,
            collection_id,
            site_id,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", API_BASE, path))
            .bearer_auth(&self.token)
            .header("accept", "application/json")
    }

    /// Fetch every item in the collection, paging with offset/limit.
    pub async fn list_items(&self) -> Result<Vec<WebflowItem>> {
        let mut all_items = Vec::new();
        let mut offset = 0;
        loop {
            let path = format!(
                "/collections/{}/items?limit={}&offset={}",
                self.collection_id, PAGE_LIMIT, offset
            );
            let response = self
                .request(reqwest::Method::GET, &path)
                .send()
                .await?
                .error_for_status()?;
            let page: ItemsPage = response
                .json()
                .await
                .context("Failed to parse collection items page")?;
            let items = page.items.unwrap_or_default();
            if items.is_empty() {
                break;
            }
            let count = items.len();
            all_items.extend(items);
            if count < PAGE_LIMIT {
                break;
            }
            offset += PAGE_LIMIT;
            sleep(Duration::from_millis(PAGE_DELAY_MS)).await;
        }
        tracing::info!("Total Webflow items fetched: {}", all_items.len());
        Ok(all_items)
    }

    /// Create a collection item; returns the new item id.
    pub async fn create_item(&self, fields: &Value) -> Result<String> {
        let body = json!({
            "fieldData": fields,
            "isArchived": false,
            "isDraft": false,
        });
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/collections/{}/items", self.collection_id),
            )
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Webflow create failed ({}): {}", status, text));
        }
        let created: WebflowItem = response
            .json()
            .await
            .context("Failed to parse created item")?;
        Ok(created.id)
    }

    pub async fn update_item(&self, item_id: &str, fields: &Value) -> Result<()> {
        let body = json!({
            "fieldData": fields,
            "isArchived": false,
            "isDraft": false,
        });
        let response = self
            .request(
                reqwest::Method::PATCH,
                &format!("/collections/{}/items/{}", self.collection_id, item_id),
            )
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Webflow update failed ({}): {}", status, text));
        }
        Ok(())
    }

    /// Archive an item instead of deleting it, and mark it not live so
    /// templates can filter it out.
    pub async fn archive_item(&self, item_id: &str) -> Result<()> {
        let body = json!({
            "fieldData": { "is-live": false },
            "isArchived": true,
        });
        self.request(
            reqwest::Method::PATCH,
            &format!("/collections/{}/items/{}", self.collection_id, item_id),
        )
        .json(&body)
        .send()
        .await?
        .error_for_status()
        .context("Webflow archive failed")?;
        Ok(())
    }

    /// Publish a batch of item ids to the live site.
    pub async fn publish_items(&self, item_ids: &[String]) -> Result<()> {
        if item_ids.is_empty() {
            return Ok(());
        }
        let body = json!({ "itemIds": item_ids });
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/collections/{}/items/publish", self.collection_id),
            )
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Webflow publish failed ({}): {}", status, text));
        }
        tracing::info!("Published {} items", item_ids.len());
        Ok(())
    }

    /// Publish the whole site, including custom domains when configured.
    pub async fn publish_site(&self) -> Result<()> {
        let response = self
            .request(reqwest::Method::GET, &format!("/sites/{}", self.site_id))
            .send()
            .await?
            .error_for_status()?;
        let info: SiteInfo = response.json().await.context("Failed to parse site info")?;
        let domain_ids: Vec<String> = info
            .custom_domains
            .unwrap_or_default()
            .into_iter()
            .map(|d| d.id)
            .collect();

        let body = json!({
            "publishToWebflowSubdomain": true,
            "customDomains": domain_ids,
        });
        self.request(
            reqwest::Method::POST,
            &format!("/sites/{}/publish", self.site_id),
        )
        .json(&body)
        .send()
        .await?
        .error_for_status()
        .context("Site publish failed")?;
        tracing::info!("Site publish triggered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_id_reads_string_and_number_fields() {
        let item = WebflowItem {
            id: "a".to_string(),
            field_data: Some(json!({ "listing-id": "12345" })),
        };
        assert_eq!(item.listing_id().as_deref(), Some("12345"));

        let item = WebflowItem {
            id: "b".to_string(),
            field_data: Some(json!({ "listing-id": 12345 })),
        };
        assert_eq!(item.listing_id().as_deref(), Some("12345"));

        let item = WebflowItem {
            id: "c".to_string(),
            field_data: Some(json!({ "listing-id": "" })),
        };
        assert_eq!(item.listing_id(), None);

        let item = WebflowItem {
            id: "d".to_string(),
            field_data: None,
        };
        assert_eq!(item.listing_id(), None);
    }
}
