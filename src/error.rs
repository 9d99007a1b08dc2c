use thiserror::Error;

#[derive(Error, Debug)]
pub enum DevOpsLabError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Project {0} does not exist")]
    UnknownProject(i64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DevOpsLabError>;
