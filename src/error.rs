use thiserror::Error;

#[derive(Error, Debug)]
pub enum FolioError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("playlist endpoint returned status {0}")]
    HttpStatus(u16),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("playlist is empty")]
    EmptyPlaylist,
}

pub type Result<T> = std::result::Result<T, FolioError>;
