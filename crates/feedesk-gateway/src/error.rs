//! Error types for feedesk-gateway

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Server error: {message}")]
    Server { message: String },
}
