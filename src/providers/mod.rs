//! News search providers.
//!
//! Every provider answers the same question, "which articles match this
//! keyword", and differs only in endpoint, authentication and response
//! shape. Failures never escape [`NewsSource::search`]: they are logged and
//! reported as an empty result.

mod bing;
mod brave;
mod juhe;
mod newsapi;
mod zhipu;

use std::time::Duration;

use async_trait::async_trait;
use clap::ValueEnum;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::NewsItem;

const USER_AGENT: &str = "news-harvester/1.0";

/// Something that can look up news for a keyword.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Articles for `keyword`, in provider order. Empty on any failure.
    async fn search(&self, keyword: &str) -> Vec<NewsItem>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Brave,
    Bing,
    Juhe,
    #[value(name = "newsapi")]
    NewsApi,
    #[default]
    Zhipu,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Brave => "Brave Search",
            Provider::Bing => "Bing News",
            Provider::Juhe => "Juhe",
            Provider::NewsApi => "NewsAPI.org",
            Provider::Zhipu => "Zhipu AI",
        }
    }

    /// Environment variable checked before the configured key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::Brave => "BRAVE_API_KEY",
            Provider::Bing => "BING_API_KEY",
            Provider::Juhe => "JUHE_API_KEY",
            Provider::NewsApi => "NEWSAPI_KEY",
            Provider::Zhipu => "ZHIPU_API_KEY",
        }
    }

    fn timeout(&self) -> Duration {
        match self {
            // Chat completions take a while to generate.
            Provider::Zhipu => Duration::from_secs(30),
            _ => Duration::from_secs(10),
        }
    }
}

pub struct ProviderClient {
    provider: Provider,
    client: Client,
    api_key: Option<String>,
    max_results: u32,
}

impl ProviderClient {
    pub fn new(provider: Provider, api_key: Option<String>, max_results: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(provider.timeout())
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            provider,
            client,
            api_key,
            max_results,
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    async fn fetch(&self, api_key: &str, keyword: &str) -> Result<Vec<NewsItem>> {
        match self.provider {
            Provider::Brave => {
                brave::search(&self.client, api_key, keyword, self.max_results).await
            }
            Provider::Bing => bing::search(&self.client, api_key, keyword, self.max_results).await,
            Provider::Juhe => juhe::search(&self.client, api_key, keyword).await,
            Provider::NewsApi => {
                newsapi::search(&self.client, api_key, keyword, self.max_results).await
            }
            Provider::Zhipu => zhipu::search(&self.client, api_key, keyword).await,
        }
    }
}

#[async_trait]
impl NewsSource for ProviderClient {
    async fn search(&self, keyword: &str) -> Vec<NewsItem> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!(
                provider = self.provider.name(),
                env_var = self.provider.api_key_env(),
                "No API key configured, skipping search"
            );
            return Vec::new();
        };

        match self.fetch(api_key, keyword).await {
            Ok(items) => {
                tracing::debug!(
                    provider = self.provider.name(),
                    keyword,
                    count = items.len(),
                    "Search finished"
                );
                items
            }
            Err(e) => {
                tracing::error!(
                    provider = self.provider.name(),
                    keyword,
                    error = %e,
                    "Search failed"
                );
                Vec::new()
            }
        }
    }
}

/// Keeps the first `max` characters of `text`, appending `...` when cut.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
