//! Sentence embedding and embedding inversion clients.
//!
//! The steering engine needs two text/vector conversions it does not own:
//! turning sentences into embeddings and turning (steered) embeddings back into
//! sentences. This crate talks to both services over HTTP.
//!
//! Modes:
//!
//! - **api**: POST to a remote endpoint. Embedding payloads follow the
//!   Hugging Face (`{"inputs"}`), OpenAI (`{"input","model"}`) or custom
//!   (`{"texts"}`) shape. Inversion posts `{"embeddings","num_steps"}`.
//! - **fast**: deterministic local stubs, handy for development and tests.
//!
//! Remote calls are wrapped in a per-endpoint circuit breaker and retried with
//! exponential backoff on transient failures (see [`resilience`]).
//!
//! ```no_run
//! use semantic::{SemanticClient, SemanticConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cfg = SemanticConfig {
//!         mode: "api".into(),
//!         api_url: Some("http://localhost:8081/embed".into()),
//!         ..Default::default()
//!     };
//!     let client = SemanticClient::new(cfg).unwrap();
//!     let vectors = client.embed_batch(&["A quiet river.".into()]).await.unwrap();
//!     let text = client.invert_batch(&vectors).await.unwrap();
//!     println!("{text:?}");
//! }
//! ```

pub mod config;
pub mod error;
pub mod resilience;

mod api;
mod normalize;
mod serde_millis;
mod stub;

pub use crate::api::SemanticClient;
pub use crate::config::{InversionConfig, SemanticConfig};
pub use crate::error::SemanticError;
pub use crate::normalize::{l2_norm, l2_normalize_in_place};
