use reqwest::Client;
use serde::Deserialize;

use crate::error::Result;
use crate::models::{now_rfc3339, NewsItem, DEFAULT_IMAGE_URL};

const BING_NEWS_URL: &str = "https://api.bing.microsoft.com/v7.0/news/search";
const MARKET: &str = "zh-CN";

#[derive(Debug, Deserialize)]
struct BingResponse {
    #[serde(default)]
    value: Vec<BingArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingArticle {
    #[serde(default)]
    name: String,
    #[serde(default)]
    provider: Vec<BingProvider>,
    #[serde(default)]
    url: String,
    date_published: Option<String>,
    image: Option<BingImage>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BingProvider {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct BingImage {
    thumbnail: Option<BingThumbnail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingThumbnail {
    content_url: Option<String>,
}

pub(super) async fn search(
    client: &Client,
    api_key: &str,
    keyword: &str,
    max_results: u32,
) -> Result<Vec<NewsItem>> {
    let response = client
        .get(BING_NEWS_URL)
        .header("Ocp-Apim-Subscription-Key", api_key)
        .query(&[
            ("q", keyword.to_string()),
            ("count", max_results.to_string()),
            ("mkt", MARKET.to_string()),
        ])
        .send()
        .await?
        .error_for_status()?;

    let body: BingResponse = response.json().await?;
    Ok(into_items(body, keyword))
}

fn into_items(body: BingResponse, keyword: &str) -> Vec<NewsItem> {
    body.value
        .into_iter()
        .map(|a| NewsItem {
            title: a.name,
            source: a.provider.into_iter().next().map(|p| p.name).unwrap_or_default(),
            link: a.url,
            published_at: a.date_published.unwrap_or_else(now_rfc3339),
            tags: [keyword.to_string()].into(),
            image_url: a
                .image
                .and_then(|i| i.thumbnail)
                .and_then(|t| t.content_url)
                .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()),
            content: a.description.unwrap_or_default(),
        })
        .collect()
}
