use thiserror::Error;

/// Everything that can go wrong outside the fetch path
///
/// Fragment resolution itself never returns these; it logs and hands back
/// an empty fragment instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storefront request failed: {0}")]
    ApiError(String),

    #[error("Storage operation failed: {0}")]
    StorageError(#[from] rvp_cache::StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Carousel not ready after {0}ms")]
    ReadinessTimeout(u64),

    #[error("Carousel failed: {0}")]
    CarouselError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<rvp_api::StorefrontError> for Error {
    fn from(e: rvp_api::StorefrontError) -> Self {
        Error::ApiError(e.to_string())
    }
}
