//! Steering, interpolation and corpus management over sentence embeddings.
//!
//! A [`Dataset`] bundles a sparse-autoencoder feature model, the feature
//! catalog derived from its decoder, a growing [`store::EmbeddingStore`] and a
//! [`projection::ProjectionAdapter`]. Operations on it reach three external
//! capabilities through the traits in [`capabilities`]: an embedder, an
//! inverter (embedding to text) and a chat model. Every capability call runs
//! under a timeout and is reported to an [`EngineMetrics`] observer.
//!
//! Generated sentences are always added to the dataset they were generated
//! for, so later requests can steer or interpolate from them by index.
//!
//! ```no_run
//! use engine::{Dataset, FeatureWeight, SteerRequest};
//! # async fn demo(dataset: Dataset) -> Result<(), engine::EngineError> {
//! let points = dataset
//!     .steer(&SteerRequest {
//!         sentence: "The harbor was quiet at dawn.".into(),
//!         index: 0,
//!         features: vec![FeatureWeight { id: 12, weight: 0.4 }],
//!         gen_num: 3,
//!     })
//!     .await?;
//! for p in points {
//!     println!("{:>6.2} {:>6.2}  {}", p.umap_x, p.umap_y, p.sentence);
//! }
//! # Ok(())
//! # }
//! ```

pub mod capabilities;
pub mod config;
pub mod error;
pub mod metrics;
pub mod types;
pub mod vector;

mod context;
mod dataset;
mod inspect;
mod interpolation;
mod prompt_cache;
mod registry;
mod steering;

pub use crate::capabilities::{Capabilities, Embedder, Inverter, LanguageModel};
pub use crate::config::EngineConfig;
pub use crate::context::EngineContext;
pub use crate::dataset::Dataset;
pub use crate::error::{Capability, EngineError, EngineResult};
pub use crate::metrics::{EngineMetrics, NoopMetrics, Operation};
pub use crate::prompt_cache::PromptCache;
pub use crate::registry::DatasetRegistry;
pub use crate::types::{
    ActivationSummary, AddOutcome, FeatureWeight, GeneratedPoint, InstructRequest,
    InterpolateRequest, SteerRequest,
};
