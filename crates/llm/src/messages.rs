//! Wire types for every dialect, plus the unified intermediate
//! representation (`unified`) they all convert through.

pub mod ai_sdk;
pub mod anthropic;
pub mod antigravity;
pub mod gemini;
pub mod openai;
pub mod openai_responses;
pub mod unified;
