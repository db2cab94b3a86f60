use std::collections::BTreeSet;

use chrono::Local;
use serde::{Deserialize, Deserializer, Serialize};

/// Shown by the front-end when a provider has no thumbnail for an article.
pub const DEFAULT_IMAGE_URL: &str = "https://via.placeholder.com/300x200/3b82f6/ffffff?text=News";

/// Tags are a set: duplicates collapse and iteration order is stable.
pub type TagSet = BTreeSet<String>;

/// An article as returned by a provider, before the store has given it an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub link: String,
    #[serde(default = "now_rfc3339")]
    pub published_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: TagSet,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

/// A persisted article. `link` is the natural key, `id` the surrogate one.
///
/// Files written by older tools may carry `null` where a value was missing;
/// those load as empty strings or an empty tag set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub link: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub published_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: TagSet,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn now_rfc3339() -> String {
    Local::now().to_rfc3339()
}

impl NewsItem {
    /// An item for `link` with every other field defaulted.
    #[cfg(test)]
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            title: String::new(),
            source: String::new(),
            link: link.into(),
            published_at: now_rfc3339(),
            tags: TagSet::new(),
            image_url: String::new(),
            content: String::new(),
        }
    }

    #[cfg(test)]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[cfg(test)]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Adds `keyword` to the tag set unless it is already there.
    pub fn ensure_tag(&mut self, keyword: &str) {
        if !self.tags.contains(keyword) {
            self.tags.insert(keyword.to_string());
        }
    }

    pub fn into_record(self, id: i64) -> NewsRecord {
        NewsRecord {
            id,
            title: self.title,
            source: self.source,
            link: self.link,
            published_at: self.published_at,
            tags: self.tags,
            image_url: self.image_url,
            content: self.content,
        }
    }
}

impl NewsRecord {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}
