//! Dialect-transformation gateway core: parses a request or response in one
//! LLM provider's wire format, represents it in a dialect-neutral
//! intermediate form, and re-emits it in another provider's wire format.
//!
//! This crate performs no network I/O of its own — no upstream calls, no
//! retries, no connection pooling. A host embeds it to transform payloads it
//! already has in hand; everything downstream of that (HTTP routing,
//! credential storage, rate limiting) is the host's concern.

pub mod adapter;
mod antigravity_repair;
pub mod error;
pub mod facade;
pub mod messages;
pub mod registry;
pub mod responses_bridge;
pub mod router;
pub mod signature_store;
pub mod streaming;
mod unknown_fields;

pub use adapter::{AdapterConfig, DialectAdapter, StreamFraming};
pub use error::{GatewayError, Result};
pub use facade::Facade;
pub use messages::unified::{self, UnifiedRequest, UnifiedResponse, UnifiedToolChoice};
pub use registry::Registry;
pub use router::{ModelCatalog, ModelRoute, Router};
pub use signature_store::SignatureStore;
