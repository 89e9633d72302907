//! Generation orchestrator and the adapter contracts it drives.
//!
//! The orchestrator owns the generic parts of a call: input validation, the HTTP round trip,
//! dual-mode decoding, the stream worker and result finalization. Provider specifics live
//! behind [`ProviderAdapter`].

pub mod adapter;
pub mod builder;
pub mod core;
pub mod decoder;
pub mod stream;
pub mod types;

pub use adapter::{ApiErrorResponse, ChunkProcessor, GenRequest, GenResponse, ProviderAdapter};
pub use builder::OrchestratorBuilder;
pub use core::Orchestrator;
pub use decoder::{decode_json, Decoded, ResponseDecoder, Strictness};
pub use stream::GenStream;
pub use types::CancelHandle;
