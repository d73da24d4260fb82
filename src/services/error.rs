use std::time::Duration;
use thiserror::Error;

/// Failures of the advisor operations. `Remote`, `Timeout` and `Transport`
/// are all failed calls to the model provider; none of them is retried.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("API key not found: send it in the x-api-key header or set DASHSCOPE_API_KEY")]
    MissingCredential,
    #[error("model API error ({status}): {code}: {message}")]
    Remote {
        status: u16,
        code: String,
        message: String,
    },
    #[error("model API did not answer within {0:?}")]
    Timeout(Duration),
    #[error("failed to reach the model API: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("model returned an unreadable response: {0}")]
    MalformedResponse(String),
    #[error("invalid upload: {0}")]
    InvalidUpload(String),
}
