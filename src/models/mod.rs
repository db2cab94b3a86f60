mod news;

pub(crate) use news::now_rfc3339;
pub use news::{NewsItem, NewsRecord, TagSet, DEFAULT_IMAGE_URL};
