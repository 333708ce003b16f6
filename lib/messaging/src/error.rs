//! Error types for the messaging crate.

use std::fmt;

/// Errors from the messaging gateway.
///
/// Gateway errors are deliberately coarse: the flow engine logs and swallows
/// them, so the variants only need to distinguish "the provider said no" from
/// "we never reached the provider".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The provider rejected the message.
    Provider {
        /// HTTP-ish status code, when the provider gave one.
        status: Option<u16>,
        /// Provider error message.
        message: String,
    },
    /// The request never completed (DNS, TLS, timeout, ...).
    Transport { message: String },
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider {
                status: Some(status),
                message,
            } => write!(f, "provider rejected message ({status}): {message}"),
            Self::Provider {
                status: None,
                message,
            } => write!(f, "provider rejected message: {message}"),
            Self::Transport { message } => write!(f, "transport failure: {message}"),
        }
    }
}

impl std::error::Error for GatewayError {}

/// Errors from conversation-side message recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderError {
    /// The backing store rejected the write.
    Backend { message: String },
}

impl fmt::Display for RecorderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend { message } => write!(f, "message record write failed: {message}"),
        }
    }
}

impl std::error::Error for RecorderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_error_display() {
        let err = GatewayError::Provider {
            status: Some(429),
            message: "rate limited".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("429"));
        assert!(text.contains("rate limited"));
    }

    #[test]
    fn transport_error_display() {
        let err = GatewayError::Transport {
            message: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("connection refused"));
    }
}
