use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{now_rfc3339, NewsItem, DEFAULT_IMAGE_URL};

const NEWSAPI_EVERYTHING_URL: &str = "https://newsapi.org/v2/everything";
const TECH_DOMAINS: &str =
    "techcrunch.com,engadget.com,thenextweb.com,arstechnica.com,wired.com,theverge.com";
const REMOVED_TITLE: &str = "[Removed]";
const SUMMARY_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    #[serde(default)]
    status: String,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    title: Option<String>,
    source: Option<NewsApiSource>,
    #[serde(default)]
    url: String,
    published_at: Option<String>,
    url_to_image: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}

pub(super) async fn search(
    client: &Client,
    api_key: &str,
    keyword: &str,
    max_results: u32,
) -> Result<Vec<NewsItem>> {
    let response = client
        .get(NEWSAPI_EVERYTHING_URL)
        .header("X-Api-Key", api_key)
        .query(&[
            ("q", keyword.to_string()),
            ("language", "en".to_string()),
            ("sortBy", "publishedAt".to_string()),
            ("pageSize", max_results.to_string()),
            ("domains", TECH_DOMAINS.to_string()),
        ])
        .send()
        .await?;

    // Error bodies carry a useful message, so parse before checking status.
    let body: NewsApiResponse = response.json().await?;
    into_items(body, keyword)
}

fn into_items(body: NewsApiResponse, keyword: &str) -> Result<Vec<NewsItem>> {
    if body.status != "ok" {
        return Err(AppError::ProviderApi {
            provider: "NewsAPI.org".to_string(),
            message: body.message.unwrap_or_else(|| format!("status {}", body.status)),
        });
    }

    let items: Vec<NewsItem> = body
        .articles
        .into_iter()
        .filter(|a| a.title.as_deref() != Some(REMOVED_TITLE))
        .map(|a| NewsItem {
            title: a.title.unwrap_or_default(),
            source: a.source.and_then(|s| s.name).unwrap_or_default(),
            link: a.url,
            published_at: a.published_at.unwrap_or_else(now_rfc3339),
            tags: [keyword.to_string(), "AI".to_string(), "科技".to_string()].into(),
            image_url: a
                .url_to_image
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()),
            content: a
                .description
                .filter(|d| !d.is_empty())
                .map(|d| format!("{}...", d.chars().take(SUMMARY_CHARS).collect::<String>()))
                .unwrap_or_default(),
        })
        .collect();

    tracing::info!(count = items.len(), "NewsAPI.org returned articles");
    Ok(items)
}
