use serde_json::Value;
use thiserror::Error;

use crate::mutation::ErrorDetail;

#[derive(Error, Debug, Clone)]
pub enum ClusterError {
    /// No cluster is configured on the remote node. This is a steady state,
    /// not a fault.
    #[error("no cluster configured")]
    NotFound { payload: Option<Value> },

    #[error("request rejected with HTTP {status}: {detail}")]
    Rejected {
        status: u16,
        detail: ErrorDetail,
        payload: Option<Value>,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClusterError {
    /// Builds the error for a non-success HTTP response.
    ///
    /// A 404 is always `NotFound`; every other status becomes `Rejected` with
    /// the body rendered into an [`ErrorDetail`].
    pub fn from_http(status: u16, body: &str) -> Self {
        let payload = serde_json::from_str::<Value>(body).ok();
        if status == 404 {
            return Self::NotFound { payload };
        }
        let detail = ErrorDetail::from_response(status, payload.as_ref(), body);
        Self::Rejected {
            status,
            detail,
            payload,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Raw JSON body that came with the failure, if any.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::NotFound { payload } | Self::Rejected { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }

    /// One line per reported problem, suitable for a notification.
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Rejected { detail, .. } => detail.lines(),
            other => vec![other.to_string()],
        }
    }
}

impl From<serde_json::Error> for ClusterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<config::ConfigError> for ClusterError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClusterError>;
