use reqwest::Client;
use serde::Deserialize;

use crate::error::Result;
use crate::models::{now_rfc3339, NewsItem, DEFAULT_IMAGE_URL};

const BRAVE_NEWS_URL: &str = "https://api.search.brave.com/res/v1/news/search";

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    source: Option<String>,
    #[serde(default)]
    url: String,
    published_time: Option<String>,
    thumbnail: Option<Thumbnail>,
    description: Option<String>,
    snippet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    src: Option<String>,
}

pub(super) async fn search(
    client: &Client,
    api_key: &str,
    keyword: &str,
    max_results: u32,
) -> Result<Vec<NewsItem>> {
    let response = client
        .get(BRAVE_NEWS_URL)
        .header("Accept", "application/json")
        .header("X-Subscription-Token", api_key)
        .query(&[("q", keyword.to_string()), ("count", max_results.to_string())])
        .send()
        .await?
        .error_for_status()?;

    let body: BraveResponse = response.json().await?;
    Ok(into_items(body, keyword))
}

fn into_items(body: BraveResponse, keyword: &str) -> Vec<NewsItem> {
    body.results
        .into_iter()
        .map(|r| NewsItem {
            title: r.title,
            source: r.source.unwrap_or_default(),
            link: r.url,
            published_at: r.published_time.unwrap_or_else(now_rfc3339),
            tags: [keyword.to_string()].into(),
            image_url: r
                .thumbnail
                .and_then(|t| t.src)
                .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()),
            content: r.description.or(r.snippet).unwrap_or_default(),
        })
        .collect()
}
