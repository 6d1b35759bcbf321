//! Safetensors persistence for autoencoders and dense matrices.
//!
//! Two autoencoder layouts are understood:
//!
//! - **tagged**: header metadata carries `config` (`{"type","n_inputs","n_features"}`)
//!   and `parameters`; the type selects the variant.
//! - **normalized**: a bare state dict with `W_enc`, `b_enc`, `W_dec`, `b_dec`.
//!   Dimensions come from `W_enc` and the result is always the plain variant.
//!
//! Tensors may be stored as f32, f64, f16 or bf16; everything is widened or
//! narrowed to f32 on read. Writes are always f32.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use half::{bf16, f16};
use ndarray::{Array1, Array2};
use safetensors::tensor::TensorView;
use safetensors::{Dtype, SafeTensorError, SafeTensors};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FeatureError, FeatureResult};
use crate::model::{
    FeatureModel, GatedSparseAutoencoder, NamedTensor, Sae, SaeConfig, SaeKind,
    SparseAutoencoder,
};

/// Metadata key holding the model header.
pub const CONFIG_KEY: &str = "config";
/// Metadata key holding free-form training parameters.
pub const PARAMETERS_KEY: &str = "parameters";

/// On-disk arrangement of an autoencoder file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaeLayout {
    #[default]
    Normalized,
    Tagged,
}

/// Load an autoencoder from bytes in the given layout.
pub fn load_sae_with_layout(bytes: &[u8], layout: SaeLayout) -> FeatureResult<Sae> {
    match layout {
        SaeLayout::Normalized => load_normalized(bytes).map(Sae::Plain),
        SaeLayout::Tagged => load_sae(bytes),
    }
}

/// Load an autoencoder file in the given layout.
pub fn load_sae_file(path: impl AsRef<Path>, layout: SaeLayout) -> FeatureResult<Sae> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let sae = load_sae_with_layout(&bytes, layout)?;
    info!(
        path = %path.display(),
        ?layout,
        kind = sae.kind().type_name(),
        n_inputs = sae.n_inputs(),
        n_features = sae.n_features(),
        "loaded sparse autoencoder"
    );
    Ok(sae)
}

/// Serialize an exported model with its config and training parameters.
pub fn save_sae(model: &Sae, parameters: &serde_json::Value) -> FeatureResult<Vec<u8>> {
    let (config, tensors) = model.export();
    let mut metadata = HashMap::new();
    metadata.insert(CONFIG_KEY.to_string(), serde_json::to_string(&config)?);
    metadata.insert(PARAMETERS_KEY.to_string(), serde_json::to_string(parameters)?);
    serialize_tensors(&tensors, Some(metadata))
}

pub fn save_sae_file(
    path: impl AsRef<Path>,
    model: &Sae,
    parameters: &serde_json::Value,
) -> FeatureResult<()> {
    let bytes = save_sae(model, parameters)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Load the metadata-tagged layout, dispatching on the stored type.
pub fn load_sae(bytes: &[u8]) -> FeatureResult<Sae> {
    let (_, header) = SafeTensors::read_metadata(bytes)?;
    let raw_config = header
        .metadata()
        .as_ref()
        .and_then(|meta| meta.get(CONFIG_KEY))
        .ok_or_else(|| FeatureError::MissingMetadata(CONFIG_KEY.to_string()))?;
    let config: SaeConfig = serde_json::from_str(raw_config)?;
    let kind = SaeKind::from_type_name(&config.sae_type)?;

    let tensors = SafeTensors::deserialize(bytes)?;
    let (d, f) = (config.n_inputs, config.n_features);
    let w_enc = read_array2(&tensors, "W_enc", Some((d, f)))?;
    let b_enc = read_array1(&tensors, "b_enc", f)?;
    let w_dec = read_array2(&tensors, "W_dec", Some((f, d)))?;
    let b_dec = read_array1(&tensors, "b_dec", d)?;

    let sae = match kind {
        SaeKind::Plain => Sae::Plain(SparseAutoencoder::from_parts(w_enc, b_enc, w_dec, b_dec)?),
        SaeKind::Gated => {
            let b_gate = read_array1(&tensors, "b_gate", f)?;
            let r_gate = read_array1(&tensors, "r_gate", f)?;
            Sae::Gated(GatedSparseAutoencoder::from_parts(
                w_enc, b_enc, b_gate, r_gate, w_dec, b_dec,
            )?)
        }
    };
    debug!(kind = kind.type_name(), n_inputs = d, n_features = f, "decoded tagged autoencoder");
    Ok(sae)
}

/// Load a bare state dict as a plain autoencoder.
pub fn load_normalized(bytes: &[u8]) -> FeatureResult<SparseAutoencoder> {
    let tensors = SafeTensors::deserialize(bytes)?;
    let w_enc = read_array2(&tensors, "W_enc", None)?;
    let (d, f) = w_enc.dim();
    let b_enc = read_array1(&tensors, "b_enc", f)?;
    let w_dec = read_array2(&tensors, "W_dec", Some((f, d)))?;
    let b_dec = read_array1(&tensors, "b_dec", d)?;
    SparseAutoencoder::from_parts(w_enc, b_enc, w_dec, b_dec)
}

pub fn load_normalized_file(path: impl AsRef<Path>) -> FeatureResult<SparseAutoencoder> {
    let bytes = fs::read(path)?;
    load_normalized(&bytes)
}

/// Read one rank-2 tensor by name.
pub fn read_matrix(bytes: &[u8], name: &str) -> FeatureResult<Array2<f32>> {
    let tensors = SafeTensors::deserialize(bytes)?;
    read_array2(&tensors, name, None)
}

pub fn read_matrix_file(path: impl AsRef<Path>, name: &str) -> FeatureResult<Array2<f32>> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let matrix = read_matrix(&bytes, name)?;
    info!(
        path = %path.display(),
        tensor = name,
        rows = matrix.nrows(),
        cols = matrix.ncols(),
        "loaded matrix"
    );
    Ok(matrix)
}

/// Write a single rank-2 tensor as a safetensors blob.
pub fn write_matrix(name: &str, matrix: &Array2<f32>) -> FeatureResult<Vec<u8>> {
    serialize_tensors(&[NamedTensor::matrix(name, matrix)], None)
}

fn serialize_tensors(
    tensors: &[NamedTensor],
    metadata: Option<HashMap<String, String>>,
) -> FeatureResult<Vec<u8>> {
    let views = tensors
        .iter()
        .map(|t| {
            let bytes: &[u8] = bytemuck::cast_slice(&t.data);
            TensorView::new(Dtype::F32, t.shape.clone(), bytes).map(|view| (t.name.as_str(), view))
        })
        .collect::<Result<Vec<_>, SafeTensorError>>()?;
    Ok(safetensors::serialize(views, &metadata)?)
}

fn tensor<'a>(tensors: &'a SafeTensors<'a>, name: &str) -> FeatureResult<TensorView<'a>> {
    match tensors.tensor(name) {
        Ok(view) => Ok(view),
        Err(SafeTensorError::TensorNotFound(_)) => Err(FeatureError::MissingTensor(name.to_string())),
        Err(other) => Err(other.into()),
    }
}

fn read_array1(tensors: &SafeTensors<'_>, name: &str, len: usize) -> FeatureResult<Array1<f32>> {
    let view = tensor(tensors, name)?;
    if view.shape() != [len] {
        return Err(FeatureError::ShapeMismatch {
            name: name.to_string(),
            expected: vec![len],
            actual: view.shape().to_vec(),
        });
    }
    Ok(Array1::from_vec(decode_f32(name, &view)?))
}

fn read_array2(
    tensors: &SafeTensors<'_>,
    name: &str,
    expected: Option<(usize, usize)>,
) -> FeatureResult<Array2<f32>> {
    let view = tensor(tensors, name)?;
    let shape = view.shape().to_vec();
    let dims = match (shape.as_slice(), expected) {
        (&[r, c], None) => (r, c),
        (&[r, c], Some(want)) if (r, c) == want => want,
        (_, want) => {
            return Err(FeatureError::ShapeMismatch {
                name: name.to_string(),
                expected: want.map(|(r, c)| vec![r, c]).unwrap_or_default(),
                actual: shape.clone(),
            })
        }
    };
    let data = decode_f32(name, &view)?;
    Array2::from_shape_vec(dims, data).map_err(|_| FeatureError::ShapeMismatch {
        name: name.to_string(),
        expected: vec![dims.0, dims.1],
        actual: view.shape().to_vec(),
    })
}

fn decode_f32(name: &str, view: &TensorView<'_>) -> FeatureResult<Vec<f32>> {
    let data = view.data();
    let values = match view.dtype() {
        Dtype::F32 => data
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        Dtype::F64 => data
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32)
            .collect(),
        Dtype::F16 => data
            .chunks_exact(2)
            .map(|c| f16::from_le_bytes([c[0], c[1]]).to_f32())
            .collect(),
        Dtype::BF16 => data
            .chunks_exact(2)
            .map(|c| bf16::from_le_bytes([c[0], c[1]]).to_f32())
            .collect(),
        other => {
            return Err(FeatureError::UnsupportedDtype {
                name: name.to_string(),
                dtype: format!("{other:?}"),
            })
        }
    };
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::{gated_fixture, plain_fixture};
    use ndarray::array;
    use serde_json::json;

    fn raw_blob(entries: &[(&str, Dtype, Vec<usize>, Vec<u8>)], meta: Option<HashMap<String, String>>) -> Vec<u8> {
        let views: Vec<(&str, TensorView<'_>)> = entries
            .iter()
            .map(|(name, dtype, shape, bytes)| {
                (*name, TensorView::new(*dtype, shape.clone(), bytes).unwrap())
            })
            .collect();
        safetensors::serialize(views, &meta).unwrap()
    }

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn tagged_round_trip_plain() {
        let sae: Sae = plain_fixture().into();
        let bytes = save_sae(&sae, &json!({"lr": 0.001})).unwrap();
        let loaded = load_sae(&bytes).unwrap();

        assert_eq!(loaded.kind(), SaeKind::Plain);
        let mut expected = plain_fixture();
        expected.normalize_decoder_weights();
        assert_eq!(loaded, Sae::Plain(expected));
    }

    #[test]
    fn tagged_round_trip_gated() {
        let sae: Sae = gated_fixture().into();
        let bytes = save_sae(&sae, &json!({})).unwrap();
        let loaded = load_sae(&bytes).unwrap();
        assert_eq!(loaded.kind(), SaeKind::Gated);

        let x = array![1.0f32, 2.0, 3.0];
        let a = sae.encode(x.view()).unwrap();
        let b = loaded.encode(x.view()).unwrap();
        // feature activations rescale by the decoder norms, reconstructions agree
        let ra = sae.decode(a.view()).unwrap();
        let rb = loaded.decode(b.view()).unwrap();
        for (p, q) in ra.iter().zip(rb.iter()) {
            assert!((p - q).abs() < 1e-5);
        }
    }

    #[test]
    fn saved_metadata_carries_config_and_parameters() {
        let sae: Sae = plain_fixture().into();
        let bytes = save_sae(&sae, &json!({"epochs": 3})).unwrap();
        let (_, header) = SafeTensors::read_metadata(&bytes).unwrap();
        let meta = header.metadata().as_ref().unwrap();

        let config: serde_json::Value = serde_json::from_str(&meta[CONFIG_KEY]).unwrap();
        assert_eq!(
            config,
            json!({"type": "SparseAutoencoder", "n_inputs": 3, "n_features": 2})
        );
        let params: serde_json::Value = serde_json::from_str(&meta[PARAMETERS_KEY]).unwrap();
        assert_eq!(params["epochs"], 3);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut meta = HashMap::new();
        meta.insert(
            CONFIG_KEY.to_string(),
            r#"{"type":"TopKAutoencoder","n_inputs":1,"n_features":1}"#.to_string(),
        );
        let bytes = raw_blob(&[("W_enc", Dtype::F32, vec![1, 1], f32_bytes(&[1.0]))], Some(meta));
        let err = load_sae(&bytes).unwrap_err();
        assert!(matches!(err, FeatureError::InvalidSaeType(ref t) if t == "TopKAutoencoder"));
    }

    #[test]
    fn missing_config_is_reported() {
        let bytes = raw_blob(&[("W_enc", Dtype::F32, vec![1, 1], f32_bytes(&[1.0]))], None);
        let err = load_sae(&bytes).unwrap_err();
        assert!(matches!(err, FeatureError::MissingMetadata(ref k) if k == "config"));
    }

    #[test]
    fn normalized_layout_takes_shape_from_encoder() {
        let bytes = raw_blob(
            &[
                ("W_enc", Dtype::F32, vec![2, 3], f32_bytes(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0])),
                ("b_enc", Dtype::F32, vec![3], f32_bytes(&[0.0, 0.0, 0.0])),
                ("W_dec", Dtype::F32, vec![3, 2], f32_bytes(&[1.0, 0.0, 0.0, 1.0, 0.6, 0.8])),
                ("b_dec", Dtype::F32, vec![2], f32_bytes(&[0.0, 0.0])),
            ],
            None,
        );
        let sae = load_normalized(&bytes).unwrap();
        assert_eq!(sae.n_inputs(), 2);
        assert_eq!(sae.n_features(), 3);
        assert_eq!(sae.decoder().row(2), array![0.6f32, 0.8]);
    }

    #[test]
    fn normalized_layout_reports_missing_tensor() {
        let bytes = raw_blob(
            &[
                ("W_enc", Dtype::F32, vec![1, 1], f32_bytes(&[1.0])),
                ("b_enc", Dtype::F32, vec![1], f32_bytes(&[0.0])),
            ],
            None,
        );
        let err = load_normalized(&bytes).unwrap_err();
        assert!(matches!(err, FeatureError::MissingTensor(ref n) if n == "W_dec"));
    }

    #[test]
    fn decoder_shape_must_match_encoder() {
        let bytes = raw_blob(
            &[
                ("W_enc", Dtype::F32, vec![1, 2], f32_bytes(&[1.0, 1.0])),
                ("b_enc", Dtype::F32, vec![2], f32_bytes(&[0.0, 0.0])),
                ("W_dec", Dtype::F32, vec![1, 2], f32_bytes(&[1.0, 1.0])),
                ("b_dec", Dtype::F32, vec![1], f32_bytes(&[0.0])),
            ],
            None,
        );
        let err = load_normalized(&bytes).unwrap_err();
        assert!(matches!(err, FeatureError::ShapeMismatch { ref name, .. } if name == "W_dec"));
    }

    #[test]
    fn half_precision_tensors_widen_to_f32() {
        let halves: Vec<u8> = [1.5f32, -2.0]
            .iter()
            .flat_map(|v| f16::from_f32(*v).to_le_bytes())
            .collect();
        let brains: Vec<u8> = [0.5f32, 4.0]
            .iter()
            .flat_map(|v| bf16::from_f32(*v).to_le_bytes())
            .collect();
        let doubles: Vec<u8> = [0.25f64, 8.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        let bytes = raw_blob(
            &[
                ("a", Dtype::F16, vec![1, 2], halves),
                ("b", Dtype::BF16, vec![2, 1], brains),
                ("c", Dtype::F64, vec![1, 2], doubles),
            ],
            None,
        );
        assert_eq!(read_matrix(&bytes, "a").unwrap(), array![[1.5f32, -2.0]]);
        assert_eq!(read_matrix(&bytes, "b").unwrap(), array![[0.5f32], [4.0]]);
        assert_eq!(read_matrix(&bytes, "c").unwrap(), array![[0.25f32, 8.0]]);
    }

    #[test]
    fn integer_tensors_are_unsupported() {
        let bytes = raw_blob(&[("ids", Dtype::I32, vec![1, 1], vec![1, 0, 0, 0])], None);
        let err = read_matrix(&bytes, "ids").unwrap_err();
        assert!(matches!(err, FeatureError::UnsupportedDtype { .. }));
    }

    #[test]
    fn matrix_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.safetensors");
        let matrix = array![[0.1f32, 0.2, 0.3], [0.4, 0.5, 0.6]];
        fs::write(&path, write_matrix("embeddings", &matrix).unwrap()).unwrap();
        assert_eq!(read_matrix_file(&path, "embeddings").unwrap(), matrix);
    }

    #[test]
    fn sae_file_round_trip_in_tagged_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sae.safetensors");
        let sae: Sae = gated_fixture().into();
        save_sae_file(&path, &sae, &json!({"k": 1})).unwrap();
        let loaded = load_sae_file(&path, SaeLayout::Tagged).unwrap();
        assert_eq!(loaded.kind(), SaeKind::Gated);
        assert_eq!(loaded.n_features(), 2);
    }

    #[test]
    fn layout_names_deserialize_lowercase() {
        let layout: SaeLayout = serde_json::from_str("\"tagged\"").unwrap();
        assert_eq!(layout, SaeLayout::Tagged);
        assert_eq!(SaeLayout::default(), SaeLayout::Normalized);
    }
}
