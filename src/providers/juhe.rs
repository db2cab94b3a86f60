use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{now_rfc3339, NewsItem};

// The headline endpoint is only served over plain HTTP.
const JUHE_TOUTIAO_URL: &str = "http://v.juhe.cn/toutiao/index";
const DEFAULT_SOURCE: &str = "聚合数据";
const MAX_ITEMS: usize = 5;

#[derive(Debug, Deserialize)]
struct JuheResponse {
    #[serde(default)]
    error_code: i64,
    reason: Option<String>,
    result: Option<JuheResult>,
}

#[derive(Debug, Deserialize)]
struct JuheResult {
    #[serde(default)]
    data: Vec<JuheNews>,
}

#[derive(Debug, Deserialize)]
struct JuheNews {
    #[serde(default)]
    title: String,
    author_name: Option<String>,
    #[serde(default)]
    url: String,
    date: Option<String>,
    thumbnail_pic_s: Option<String>,
}

/// Juhe only serves the current headlines, not a keyword search; headlines
/// mentioning the keyword are preferred.
pub(super) async fn search(client: &Client, api_key: &str, keyword: &str) -> Result<Vec<NewsItem>> {
    let response = client
        .get(JUHE_TOUTIAO_URL)
        .query(&[("type", ""), ("key", api_key)])
        .send()
        .await?
        .error_for_status()?;

    let body: JuheResponse = response.json().await?;
    into_items(body, keyword)
}

fn into_items(body: JuheResponse, keyword: &str) -> Result<Vec<NewsItem>> {
    if body.error_code != 0 {
        return Err(AppError::ProviderApi {
            provider: "Juhe".to_string(),
            message: body.reason.unwrap_or_else(|| format!("error code {}", body.error_code)),
        });
    }

    let headlines = body.result.map(|r| r.data).unwrap_or_default();
    let needle = keyword.to_lowercase();
    let (matching, others): (Vec<_>, Vec<_>) = headlines
        .into_iter()
        .partition(|n| n.title.to_lowercase().contains(&needle));
    let chosen = if matching.is_empty() { others } else { matching };

    let items: Vec<NewsItem> = chosen
        .into_iter()
        .take(MAX_ITEMS)
        .map(|n| NewsItem {
            content: n.title.clone(),
            title: n.title,
            source: n.author_name.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            link: n.url,
            published_at: n.date.unwrap_or_else(now_rfc3339),
            tags: [keyword.to_string()].into(),
            image_url: n.thumbnail_pic_s.unwrap_or_default(),
        })
        .collect();

    tracing::info!(count = items.len(), "Juhe returned headlines");
    Ok(items)
}
