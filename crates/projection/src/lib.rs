//! 2-D placement of sentence embeddings for visualization.
//!
//! A [`ProjectionAdapter`] owns one dataset's fitted [`Reducer`]. New points
//! are placed with [`ProjectionAdapter::project`]; a full refit over the
//! store swaps in a freshly fitted reducer only once fitting succeeds.
//!
//! Two reducers ship here: [`RemoteReducer`] calls a UMAP service over HTTP
//! and [`PcaReducer`] runs principal components in-process.

pub mod config;
pub mod error;
pub mod reducer;

mod adapter;
mod pca;
mod remote;

pub use crate::adapter::{ProjectedPoint, ProjectionAdapter};
pub use crate::config::ProjectionConfig;
pub use crate::error::{ProjectionError, ProjectionResult};
pub use crate::pca::PcaReducer;
pub use crate::reducer::Reducer;
pub use crate::remote::RemoteReducer;
