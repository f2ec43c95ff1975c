//! Antigravity: a thin envelope around the Gemini wire format that adds a
//! session signature used to correlate requests issued under the same
//! Antigravity session (see `signature_store`).

use serde::{Deserialize, Serialize};

use super::gemini::{Content, GenerateRequest, GenerateResponse};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AntigravityRequest {
    #[serde(flatten)]
    pub inner: GenerateRequest,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_signature: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AntigravityResponse {
    #[serde(flatten)]
    pub inner: GenerateResponse,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_signature: Option<String>,
}

/// Re-exported so adapter code can walk the flat `Content` sequence without
/// reaching into `messages::gemini` directly.
pub type AntigravityContent = Content;
