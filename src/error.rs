use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Unknown provider '{name}' (available: {available})")]
    UnknownProvider { name: String, available: String },

    #[error("No provider recognised the page at {url}")]
    NoProviderMatched { url: String },

    #[error("Parse error: {reason}")]
    Parse { reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Job failed for {url} / {specialty}: {source}")]
    Job {
        url: String,
        specialty: String,
        #[source]
        source: Box<ScrapeError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScrapeError {
    pub fn fetch(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
