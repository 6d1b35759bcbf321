//! HTTP API for sentence steering.
//!
//! Exposes every dataset operation of the steering engine over REST:
//!
//! - `GET /top_activations_and_neighbors` - feature activations, neighbors, related features
//! - `GET /generate_points` - steer a sentence along weighted features
//! - `GET /generate_points_llm` - rewrite a sentence following an instruction
//! - `GET /interpolate_points` - sentences between two endpoints
//! - `GET /get_prompt_ideas` - instruction suggestions for a sentence
//! - `POST /add_sentence_manual`, `POST /add_sentences` - grow a dataset
//! - `PUT /edit_sentence`, `DELETE /remove_sentence` - edit a dataset
//! - `POST /reembed_sentences` - refit the projection on a whole dataset
//! - `GET /health`, `GET /ready`, `GET /metrics`, `GET /metadata`
//!
//! Errors come back as `{"error": {"code", "message"}}`: 400 for malformed or
//! invalid requests, 404 for unknown datasets, 502 when an external
//! capability fails and 504 when it times out.
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
