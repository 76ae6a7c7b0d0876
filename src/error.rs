use thiserror::Error;

use crate::service::ServiceError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SimcheckError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
