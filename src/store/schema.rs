pub const SCHEMA: &str = r#"
-- news table (column names are shared with the web front-end)
CREATE TABLE IF NOT EXISTS news (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    source TEXT,
    link TEXT UNIQUE,
    publishedAt TEXT,
    tags TEXT,
    imageUrl TEXT,
    content TEXT
);

CREATE INDEX IF NOT EXISTS idx_news_published_at ON news(publishedAt DESC);
"#;
