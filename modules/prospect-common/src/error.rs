use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProspectError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Result store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
