//! Inference server clients for Qogito.
//!
//! [`LlamaCppClient`] implements `qogito_core::CompletionClient` over the
//! OpenAI-compatible streaming chat endpoint of a llama.cpp server.
//! [`InfillClient`] drives the server's fill-in-the-middle endpoint.

pub mod infill;
pub mod llama_cpp;
pub mod sse;
pub mod transport;

pub use infill::InfillClient;
pub use llama_cpp::LlamaCppClient;
pub use transport::TransportConfig;
