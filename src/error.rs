use thiserror::Error;

#[derive(Error, Debug)]
pub enum CubeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Cost function error: {0}")]
    Cost(String),

    #[error("Fetcher returned {actual} levels of rows, expected {expected}")]
    LevelCount { expected: usize, actual: usize },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CubeError>;
