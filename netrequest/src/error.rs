//! The closed set of failures a single call can end with.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

/// Boxed error as produced by transports, codecs and handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shareable error cause. [`RequestError`] stores causes this way so it can be cloned.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

pub type RequestResult<T> = std::result::Result<T, RequestError>;

/// Why a call failed.
///
/// `Display` renders the kind name and, when there is one, the detail on the
/// following line.
#[derive(Error, Debug, Clone)]
pub enum RequestError {
    /// The transport failed (DNS, TLS, connection reset, timeout, ...).
    #[error("Network error\n{0}")]
    Network(SharedError),

    /// The transport succeeded but the request rejected the status code.
    #[error("API error\nAPI returned {status}{}", body_suffix(.body))]
    Api { status: u16, body: Bytes },

    /// The response body could not be decoded into the response type.
    #[error("Decoding error\n{0}")]
    Decoding(SharedError),

    /// The request body could not be encoded.
    #[error("Encoding error\n{0}")]
    Encoding(SharedError),

    /// A request handler vetoed the call.
    #[error("{0}")]
    Handler(SharedError),

    /// Nothing came back. Mock services also use this to say "not mine".
    #[error("No response")]
    NoResponse,
}

impl RequestError {
    pub fn network(cause: impl Into<BoxError>) -> Self {
        Self::Network(Arc::from(cause.into()))
    }

    pub fn decoding(cause: impl Into<BoxError>) -> Self {
        Self::Decoding(Arc::from(cause.into()))
    }

    pub fn encoding(cause: impl Into<BoxError>) -> Self {
        Self::Encoding(Arc::from(cause.into()))
    }

    pub fn handler(cause: impl Into<BoxError>) -> Self {
        Self::Handler(Arc::from(cause.into()))
    }

    /// Short, human readable name of the error kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Network(_) => "Network error",
            Self::Api { .. } => "API error",
            Self::Decoding(_) => "Decoding error",
            Self::Encoding(_) => "Encoding error",
            Self::Handler(_) => "Handler error",
            Self::NoResponse => "No response",
        }
    }

    /// Detail for the kind, empty when there is nothing more to say.
    pub fn message(&self) -> String {
        match self {
            Self::Network(cause)
            | Self::Decoding(cause)
            | Self::Encoding(cause)
            | Self::Handler(cause) => cause.to_string(),
            Self::Api { status, body } => api_message(*status, body),
            Self::NoResponse => String::new(),
        }
    }

    /// Whether this is the "not handled" signal service groups fall through on.
    pub fn is_no_response(&self) -> bool {
        matches!(self, Self::NoResponse)
    }

    /// Status code of an [`Api`](Self::Api) failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[cfg(feature = "metrics")]
    pub(crate) fn kind_label(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Api { .. } => "api",
            Self::Decoding(_) => "decoding",
            Self::Encoding(_) => "encoding",
            Self::Handler(_) => "handler",
            Self::NoResponse => "no_response",
        }
    }
}

fn api_message(status: u16, body: &Bytes) -> String {
    format!("API returned {}{}", status, body_suffix(body))
}

fn body_suffix(body: &Bytes) -> String {
    match std::str::from_utf8(body) {
        Ok(text) if !text.trim().is_empty() => format!(":\n{}", text),
        _ => String::new(),
    }
}
