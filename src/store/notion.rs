// src/store/notion.rs
//! Notion database adapter (REST API, bearer token).

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde_json::{json, Value};

use super::{NewRow, StoredRow, TrendStore};
use crate::config::{NotionProperties, StoreConfig};
use crate::ingest::providers::http_client;
use crate::ingest::types::Source;

pub const NOTION_VERSION: &str = "2022-06-28";

pub struct NotionStore {
    base_url: String,
    api_key: String,
    database_id: String,
    props: NotionProperties,
    client: Client,
}

impl NotionStore {
    /// Fails when the credential or database id is missing.
    pub fn from_config(cfg: &StoreConfig) -> Result<Self> {
        let api_key = cfg
            .api_key
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow!("missing Notion API key (NOTION_API_KEY)"))?;
        let database_id = cfg
            .database_id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow!("missing Notion database id (NOTION_DATABASE_ID)"))?;
        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            database_id,
            props: cfg.properties.clone(),
            client: http_client(),
        })
    }

    async fn call(&self, method: reqwest::Method, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .request(method, &url)
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("notion request {path}"))?;
        let status = resp.status();
        let text = resp.text().await.context("notion body")?;
        if !status.is_success() {
            return Err(anyhow!("notion {path} returned {status}: {text}"));
        }
        serde_json::from_str(&text).context("notion json")
    }

    async fn query_first(&self, filter: Value, hint: Option<Source>) -> Result<Option<StoredRow>> {
        let path = format!("/v1/databases/{}/query", self.database_id);
        let body = json!({ "filter": filter, "page_size": 1 });
        let v = self.call(reqwest::Method::POST, &path, body).await?;
        match v.get("results").and_then(Value::as_array).and_then(|r| r.first()) {
            Some(page) => self.parse_page(page, hint).map(Some),
            None => Ok(None),
        }
    }

    fn rich_text(content: &str) -> Value {
        json!([{ "text": { "content": content } }])
    }

    fn parse_page(&self, page: &Value, hint: Option<Source>) -> Result<StoredRow> {
        let id = page
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("notion page without id"))?
            .to_string();
        let props = page.get("properties").cloned().unwrap_or(Value::Null);
        let prop = |name: &str| props.get(name).cloned().unwrap_or(Value::Null);

        let source = prop(self.props.source.as_str())
            .pointer("/select/name")
            .and_then(Value::as_str)
            .and_then(Source::from_label)
            .or(hint);
        let last_edited_at = page
            .get("last_edited_time")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        // Rows created by hand may lack a date; treat them as seen today.
        let date = prop(self.props.date.as_str())
            .pointer("/date/start")
            .and_then(Value::as_str)
            .and_then(|s| s.get(..10))
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .unwrap_or_else(|| Utc::now().date_naive());

        Ok(StoredRow {
            id,
            title: plain_text(&prop(self.props.title.as_str()), "title"),
            url: prop(self.props.url.as_str())
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            source,
            date,
            description: plain_text(&prop(self.props.description.as_str()), "rich_text"),
            last_edited_at,
        })
    }
}

fn plain_text(prop: &Value, kind: &str) -> String {
    prop.get(kind)
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| {
                    p.get("plain_text")
                        .or_else(|| p.pointer("/text/content"))
                        .and_then(Value::as_str)
                })
                .collect::<String>()
        })
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl TrendStore for NotionStore {
    async fn query_by_url(&self, url: &str) -> Result<Option<StoredRow>> {
        let filter = json!({ "property": self.props.url, "url": { "equals": url } });
        self.query_first(filter, None).await
    }

    async fn query_by_title_contains_and_source(
        &self,
        title: &str,
        source: Source,
    ) -> Result<Option<StoredRow>> {
        let filter = json!({
            "and": [
                { "property": self.props.title, "title": { "contains": title } },
                { "property": self.props.source, "select": { "equals": source.label() } }
            ]
        });
        self.query_first(filter, Some(source)).await
    }

    async fn insert_row(&self, row: NewRow) -> Result<StoredRow> {
        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": {
                self.props.title.as_str(): { "title": Self::rich_text(&row.title) },
                self.props.date.as_str(): { "date": { "start": row.date.to_string() } },
                self.props.source.as_str(): { "select": { "name": row.source.label() } },
                self.props.url.as_str(): { "url": row.url },
                self.props.description.as_str(): { "rich_text": Self::rich_text(&row.description) },
            }
        });
        let page = self.call(reqwest::Method::POST, "/v1/pages", body).await?;
        self.parse_page(&page, Some(row.source))
    }

    async fn update_row(&self, id: &str, date: NaiveDate, description: &str) -> Result<()> {
        let body = json!({
            "properties": {
                self.props.date.as_str(): { "date": { "start": date.to_string() } },
                self.props.description.as_str(): { "rich_text": Self::rich_text(description) },
            }
        });
        self.call(reqwest::Method::PATCH, &format!("/v1/pages/{id}"), body)
            .await
            .map(|_| ())
    }

    fn name(&self) -> &'static str {
        "notion"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> NotionStore {
        NotionStore::from_config(&StoreConfig {
            api_key: Some("secret".into()),
            database_id: Some("db".into()),
            ..StoreConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let cfg = StoreConfig {
            api_key: None,
            database_id: Some("db".into()),
            ..StoreConfig::default()
        };
        assert!(NotionStore::from_config(&cfg).is_err());
    }

    #[test]
    fn parses_page_properties() {
        let page = json!({
            "id": "page-1",
            "last_edited_time": "2025-06-01T08:30:00.000Z",
            "properties": {
                "Title": { "title": [{ "plain_text": "vercel / " }, { "plain_text": "next.js" }] },
                "URL": { "url": "https://github.com/vercel/next.js" },
                "Source": { "select": { "name": "GitHub" } },
                "Date": { "date": { "start": "2025-05-31" } },
                "Description": { "rich_text": [{ "plain_text": "The React Framework" }] }
            }
        });
        let row = store().parse_page(&page, None).unwrap();
        assert_eq!(row.id, "page-1");
        assert_eq!(row.title, "vercel / next.js");
        assert_eq!(row.source, Some(Source::RepoTrend));
        assert_eq!(row.date, NaiveDate::from_ymd_opt(2025, 5, 31).unwrap());
        assert!(row.last_edited_at.is_some());
    }

    #[test]
    fn bad_timestamp_becomes_none() {
        let page = json!({
            "id": "p",
            "last_edited_time": "yesterday-ish",
            "properties": { "Source": { "select": { "name": "NPM" } } }
        });
        let row = store().parse_page(&page, None).unwrap();
        assert!(row.last_edited_at.is_none());
        assert_eq!(row.source, Some(Source::PackageTrend));
    }
}
