#[derive(Debug, thiserror::Error)]
pub enum FloorwatchError {
    #[error("Upstream fetch error: {0}")]
    UpstreamFetch(#[from] reqwest::Error),

    #[error("Upstream parse error: {0}")]
    UpstreamParse(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] duckdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, FloorwatchError>;
