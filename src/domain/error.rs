// Error taxonomy shared across layers
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("unexpected upstream payload: {0}")]
    Decode(String),

    #[error("unknown database group '{0}'")]
    UnknownGroup(String),

    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Upstream(err.to_string())
    }
}
