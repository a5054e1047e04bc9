use thiserror::Error;

#[derive(Error, Debug)]
pub enum DealError {
    #[error("Invalid price input: {message}")]
    InvalidPrice { message: String },

    #[error("Invalid reference price: {message}")]
    InvalidReferencePrice { message: String },

    #[error("Invalid configuration value for '{field}' ({value}): {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },

    #[error("Announcement store unavailable: {message}")]
    TrackerUnavailable { message: String },

    #[error("Price fetch failed for '{product_id}': {message}")]
    UpstreamFetch { product_id: String, message: String },

    #[error("Notification dispatch failed for '{product_id}': {message}")]
    UpstreamDispatch { product_id: String, message: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl DealError {
    pub fn invalid_price(message: impl Into<String>) -> Self {
        DealError::InvalidPrice {
            message: message.into(),
        }
    }

    pub fn invalid_reference(message: impl Into<String>) -> Self {
        DealError::InvalidReferencePrice {
            message: message.into(),
        }
    }

    pub fn tracker(message: impl Into<String>) -> Self {
        DealError::TrackerUnavailable {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DealError>;
