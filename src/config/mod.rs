// src/config/mod.rs
//! Run, store and source configuration. Loaded once at startup from an optional
//! TOML/JSON file; secrets come from the environment (`.env` supported).

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "TREND_SYNC_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/trend_sync.toml";
pub const ENV_DRY_RUN: &str = "TREND_SYNC_DRY_RUN";
pub const ENV_NOTION_API_KEY: &str = "NOTION_API_KEY";
pub const ENV_NOTION_DATABASE_ID: &str = "NOTION_DATABASE_ID";

fn default_items_per_source() -> usize {
    15
}
fn default_true() -> bool {
    true
}
fn default_min_days_for_update() -> u32 {
    1
}
fn default_max_days_ago() -> u32 {
    14
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    #[serde(default = "default_items_per_source")]
    pub items_per_source: usize,
    #[serde(default = "default_true")]
    pub update_existing: bool,
    #[serde(default = "default_min_days_for_update")]
    pub min_days_for_update: u32,
    #[serde(default = "default_max_days_ago")]
    pub max_days_ago: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            items_per_source: default_items_per_source(),
            update_existing: true,
            min_days_for_update: default_min_days_for_update(),
            max_days_ago: default_max_days_ago(),
        }
    }
}

/// Column names in the target database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotionProperties {
    pub title: String,
    pub date: String,
    pub source: String,
    pub url: String,
    pub description: String,
}

impl Default for NotionProperties {
    fn default() -> Self {
        Self {
            title: "Title".into(),
            date: "Date".into(),
            source: "Source".into(),
            url: "URL".into(),
            description: "Description".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// "ENV" (or absent) means: read from NOTION_API_KEY.
    pub api_key: Option<String>,
    /// "ENV" (or absent) means: read from NOTION_DATABASE_ID.
    pub database_id: Option<String>,
    pub base_url: String,
    pub properties: NotionProperties,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            database_id: None,
            base_url: "https://api.notion.com".into(),
            properties: NotionProperties::default(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourcesConfig {
    pub github_base_url: String,
    pub github_languages: Vec<String>,
    /// Trending period: daily | weekly | monthly.
    pub github_since: String,
    pub relevance_keywords: Vec<String>,
    pub npm_base_url: String,
    pub npm_keywords: Vec<String>,
    pub devto_base_url: String,
    pub devto_tags: Vec<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            github_base_url: "https://github.com".into(),
            github_languages: strings(&["javascript", "typescript"]),
            github_since: "daily".into(),
            relevance_keywords: strings(crate::ingest::FRONTEND_KEYWORDS),
            npm_base_url: "https://registry.npmjs.org".into(),
            npm_keywords: strings(&[
                "react",
                "vue",
                "angular",
                "svelte",
                "frontend",
                "ui",
                "component",
                "web",
                "css",
                "html",
                "javascript",
            ]),
            devto_base_url: "https://dev.to".into(),
            devto_tags: strings(&[
                "javascript",
                "react",
                "vue",
                "typescript",
                "frontend",
                "webdev",
                "css",
                "html",
                "angular",
                "svelte",
            ]),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub run: RunConfig,
    pub store: StoreConfig,
    pub sources: SourcesConfig,
}

impl AppConfig {
    /// Load from an explicit path. Supports TOML or JSON (by extension).
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg.finish())
    }

    /// Load using env var + fallbacks:
    /// 1) $TREND_SYNC_CONFIG_PATH
    /// 2) config/trend_sync.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path");
            }
            return Self::load_from(&pb);
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default().finish())
    }

    /// Sanitize values and resolve secrets from the environment.
    pub fn finish(mut self) -> Self {
        self.run.items_per_source = self.run.items_per_source.max(1);
        self.run.max_days_ago = self.run.max_days_ago.max(1);
        if self.sources.github_since.trim().is_empty() {
            self.sources.github_since = "daily".into();
        }
        self.store.api_key = resolve_env(self.store.api_key.take(), ENV_NOTION_API_KEY);
        self.store.database_id =
            resolve_env(self.store.database_id.take(), ENV_NOTION_DATABASE_ID);
        self
    }
}

fn resolve_env(value: Option<String>, var: &str) -> Option<String> {
    match value {
        Some(v) if !v.trim().eq_ignore_ascii_case("env") && !v.trim().is_empty() => Some(v),
        _ => std::env::var(var).ok().filter(|s| !s.trim().is_empty()),
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AppConfig> {
    match hint_ext {
        "json" => serde_json::from_str(s).map_err(|e| anyhow!("invalid JSON config: {e}")),
        _ => toml::from_str(s).map_err(|e| anyhow!("invalid TOML config: {e}")),
    }
}

/// `TREND_SYNC_DRY_RUN=1|true` keeps writes in memory.
pub fn dry_run_enabled() -> bool {
    std::env::var(ENV_DRY_RUN)
        .ok()
        .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}
