use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors a dialect transformation can raise. Every variant is pure —
/// raised during parsing or transforming a value already in hand, never
/// while waiting on a network call (this crate makes none).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The incoming request doesn't parse as the dialect it claims to be, or
    /// violates a structural invariant (`isSupportedRequest` returned false).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An upstream response doesn't parse as the dialect it claims to be.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// `model` names a provider the registry has no adapter for.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// The router's prefix-matching step found more than one candidate and
    /// couldn't narrow to a single model.
    #[error("ambiguous model '{model}': matches {candidates:?}")]
    AmbiguousModel { model: String, candidates: Vec<String> },

    /// A stream event didn't parse as valid SSE framing or its declared
    /// dialect's event shape.
    #[error("failed to parse stream event: {0}")]
    StreamParseError(String),

    /// Antigravity tool-pairing repair (§4.6) found a call/response id it
    /// could neither satisfy nor synthesize a placeholder for.
    #[error("unresolved tool pairing for call id '{0}'")]
    ToolPairingUnresolved(String),
}

impl GatewayError {
    /// Stable machine-readable tag, independent of the `Display` message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidResponse(_) => "invalid_response",
            Self::UnknownProvider(_) => "unknown_provider",
            Self::AmbiguousModel { .. } => "ambiguous_model",
            Self::StreamParseError(_) => "stream_parse_error",
            Self::ToolPairingUnresolved(_) => "tool_pairing_unresolved",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_model_message_lists_candidates() {
        let err = GatewayError::AmbiguousModel {
            model: "gpt".into(),
            candidates: vec!["gpt-4o".into(), "gpt-4o-mini".into()],
        };

        assert_eq!(err.kind(), "ambiguous_model");
        assert!(err.to_string().contains("gpt-4o"));
    }
}
