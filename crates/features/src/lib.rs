//! Sparse-autoencoder feature model and the per-dataset feature catalog.
//!
//! - [`model`]: plain and gated autoencoders behind the [`FeatureModel`] trait,
//!   decoder normalization and export.
//! - [`io`]: safetensors loading/saving in the tagged and normalized layouts,
//!   plus dense matrix helpers for feature directions and embeddings.
//! - [`catalog`]: immutable feature directions with a precomputed similarity
//!   matrix and diversity sampling of similar features.
//! - [`inspect`]: activation reports for a single embedding.
//!
//! ```
//! use features::{FeatureCatalog, FeatureModel, SparseAutoencoder};
//! use ndarray::{array, Array1, Array2};
//!
//! let sae = SparseAutoencoder::from_parts(
//!     Array2::eye(2),
//!     Array1::zeros(2),
//!     array![[3.0f32, 0.0], [0.0, 1.0]],
//!     Array1::zeros(2),
//! )
//! .unwrap();
//! let activations = sae.encode(array![0.5f32, -1.0].view()).unwrap();
//! assert_eq!(activations, array![0.5f32, 0.0]);
//!
//! let catalog = FeatureCatalog::from_decoder(sae.decoder(), vec!["a".into(), "b".into()]).unwrap();
//! assert_eq!(catalog.len(), 2);
//! ```

pub mod catalog;
pub mod error;
pub mod inspect;
pub mod io;
pub mod model;

pub use crate::catalog::{load_summaries_file, parse_summaries, FeatureCatalog, FeatureSummary};
pub use crate::error::{FeatureError, FeatureResult};
pub use crate::inspect::{inspect_activations, ActivationReport, FeatureActivation, InspectOptions};
pub use crate::io::{
    load_normalized, load_normalized_file, load_sae, load_sae_file, load_sae_with_layout,
    read_matrix, read_matrix_file, save_sae, save_sae_file, write_matrix, SaeLayout,
};
pub use crate::model::{
    FeatureModel, GatedSparseAutoencoder, NamedTensor, Sae, SaeConfig, SaeKind, SparseAutoencoder,
};
