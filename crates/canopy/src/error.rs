#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid layout config `{field}`: {message}")]
    InvalidConfig { field: &'static str, message: String },
    #[error("invalid layout config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Kernel(#[from] canopy_tidy::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
