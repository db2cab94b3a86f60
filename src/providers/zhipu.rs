use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{now_rfc3339, NewsItem, DEFAULT_IMAGE_URL};

use super::truncate_chars;

const ZHIPU_CHAT_URL: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";
const ZHIPU_MODEL: &str = "glm-4";
const SOURCE_NAME: &str = "智谱清言AI";
const TRUSTED_IMAGE_HOST: &str = "images.unsplash.com";
const MAX_ITEMS: usize = 5;
const REPORT_CHARS: usize = 500;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

/// One entry of the JSON array the model is asked to answer with.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedNews {
    title: Option<String>,
    source: Option<String>,
    link: Option<String>,
    content: Option<String>,
    image_url: Option<String>,
}

fn prompt(keyword: &str) -> String {
    format!(
        "请基于'{keyword}'这个主题，生成5条最新的、具有时效性的新闻标题和内容摘要。\
         请以JSON数组格式返回，每条新闻包含以下字段：title(新闻标题)、source(知名媒体来源)、\
         content(内容摘要，100-200字)、publishedAt(发布时间，ISO格式)、imageUrl(相关图片链接)。\
         请直接返回JSON数组，不要添加其他说明文字。"
    )
}

pub(super) async fn search(client: &Client, api_key: &str, keyword: &str) -> Result<Vec<NewsItem>> {
    let request = ChatRequest {
        model: ZHIPU_MODEL.to_string(),
        messages: vec![Message {
            role: "user".to_string(),
            content: prompt(keyword),
        }],
        stream: false,
        temperature: 0.7,
    };

    let response = client
        .post(ZHIPU_CHAT_URL)
        .bearer_auth(api_key)
        .json(&request)
        .send()
        .await?
        .error_for_status()?;

    let body: ChatResponse = response.json().await?;
    let Some(reply) = body
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .map(|m| m.content)
    else {
        return Ok(Vec::new());
    };

    tracing::debug!(reply = %truncate_chars(&reply, REPORT_CHARS), "Zhipu reply");
    let items = from_reply(&reply, keyword);
    tracing::info!(count = items.len(), "Zhipu AI returned news");
    Ok(items)
}

fn search_link(keyword: &str) -> String {
    format!("https://chatglm.cn/search?q={}", urlencoding::encode(keyword))
}

fn json_array(reply: &str) -> Option<&str> {
    let re = Regex::new(r"(?s)\[.*\]").ok()?;
    re.find(reply).map(|m| m.as_str())
}

/// Turns the model's reply into items: the embedded JSON array when there
/// is one, otherwise a single report item carrying the raw reply.
fn from_reply(reply: &str, keyword: &str) -> Vec<NewsItem> {
    let parsed = json_array(reply).map(serde_json::from_str::<Vec<serde_json::Value>>);

    match parsed {
        Some(Ok(values)) => values
            .into_iter()
            .take(MAX_ITEMS)
            .filter(|v| v.is_object())
            .filter_map(|v| serde_json::from_value::<GeneratedNews>(v).ok())
            .enumerate()
            .map(|(idx, news)| generated_item(news, keyword, idx))
            .collect(),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Zhipu reply is not valid JSON, keeping it as a report");
            vec![report_item(reply, keyword)]
        }
        None => vec![report_item(reply, keyword)],
    }
}

fn generated_item(news: GeneratedNews, keyword: &str, idx: usize) -> NewsItem {
    NewsItem {
        title: news.title.unwrap_or_else(|| format!("关于{keyword}的新闻")),
        source: news.source.unwrap_or_else(|| SOURCE_NAME.to_string()),
        link: news
            .link
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| format!("{}&n={}", search_link(keyword), idx)),
        // Generated items are always stamped with the fetch time.
        published_at: now_rfc3339(),
        tags: [keyword.to_string(), "AI搜索".to_string(), "智谱清言".to_string()].into(),
        image_url: news
            .image_url
            .filter(|u| u.contains(TRUSTED_IMAGE_HOST))
            .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()),
        content: news
            .content
            .unwrap_or_else(|| "智谱清言AI生成的新闻内容".to_string()),
    }
}

fn report_item(reply: &str, keyword: &str) -> NewsItem {
    NewsItem {
        title: format!("智谱清言AI关于{keyword}的分析报告"),
        source: SOURCE_NAME.to_string(),
        link: search_link(keyword),
        published_at: now_rfc3339(),
        tags: [keyword.to_string(), "AI分析".to_string(), "智谱清言".to_string()].into(),
        image_url: DEFAULT_IMAGE_URL.to_string(),
        content: truncate_chars(reply, REPORT_CHARS),
    }
}
