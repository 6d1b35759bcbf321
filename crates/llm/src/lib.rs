//! Chat-completion client used to clean up and expand inverted sentences.
//!
//! Inverting a steered embedding yields rough text. The engine asks a chat
//! model to correct it against the original sentence, to produce stylistic
//! variations, to repair whole interpolation paths in one call and to suggest
//! prompt ideas. Prompt wording lives in [`prompts`], output cleanup in
//! [`format`].
//!
//! ```
//! use llm::format::parse_multiline;
//!
//! let lines = parse_multiline("1. First idea.\n- Second idea\n\n");
//! assert_eq!(lines, vec!["First idea.", "Second idea"]);
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod prompts;

mod client;

pub use crate::client::LlmClient;
pub use crate::config::{LlmConfig, Temperatures};
pub use crate::error::LlmError;
pub use crate::prompts::Prompt;
