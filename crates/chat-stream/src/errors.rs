/// Errors raised by a `ChatTransport` while opening or reading a chat stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Endpoint answered with a non-success status before streaming began.
    #[error("chat endpoint returned status {status_code}: {message}")]
    Status { status_code: u16, message: String },
    /// Request could not be sent (DNS, connect, TLS, timeout).
    #[error("chat request failed: {message}")]
    Connect { message: String },
    /// Stream I/O failed after the response started.
    #[error("chat stream read failed: {message}")]
    Read { message: String },
    /// Response body did not have the expected shape.
    #[error("unexpected response body: {message}")]
    Decode { message: String },
}

impl TransportError {
    /// Creates a status-level error.
    pub fn status(status_code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a connect-level error.
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    /// Creates a read-level error.
    pub fn read(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
        }
    }

    /// Creates a decode-level error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Status { message, .. }
            | Self::Connect { message }
            | Self::Read { message }
            | Self::Decode { message } => message,
        }
    }

    /// HTTP status code, when the endpoint produced one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

/// A single framed event that could not be turned into a `StreamEvent`.
///
/// Frame errors never end a turn; the consume loop logs and skips them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),
    #[error("unexpected payload for `{event}`: {message}")]
    UnexpectedPayload { event: String, message: String },
    #[error("invalid conversation id `{0}`")]
    InvalidConversationId(String),
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
}

/// Top-level error type for the public client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Submission rejected locally, before any network call.
    #[error("validation error: {0}")]
    Validation(String),
    /// Transport failure outside a running turn (for example image upload).
    #[error(transparent)]
    Transport(TransportError),
}

impl ChatError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<TransportError> for ChatError {
    fn from(value: TransportError) -> Self {
        ChatError::Transport(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_exposes_code_and_message() {
        let err = TransportError::status(502, "bad gateway");
        assert_eq!(err.status_code(), Some(502));
        assert_eq!(err.message(), "bad gateway");
        assert_eq!(
            err.to_string(),
            "chat endpoint returned status 502: bad gateway"
        );
    }

    #[test]
    fn transport_error_converts_into_chat_error() {
        let err: ChatError = TransportError::connect("refused").into();
        assert!(matches!(err, ChatError::Transport(TransportError::Connect { .. })));
        assert_eq!(err.to_string(), "chat request failed: refused");
    }
}
