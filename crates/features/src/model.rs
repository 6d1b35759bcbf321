//! Sparse autoencoders over sentence embeddings.
//!
//! Both variants share the same decoder (`f · W_dec + b_dec`) and differ in how
//! they encode:
//!
//! - [`SparseAutoencoder`]: `relu(x · W_enc + b_enc)`.
//! - [`GatedSparseAutoencoder`]: centers `x` by `b_dec`, then keeps the
//!   magnitude path `relu(pre + b_enc)` only where the gate path
//!   `pre · exp(r_gate) + b_gate` is strictly positive.
//!
//! `W_enc` is `n_inputs × n_features` and `W_dec` is `n_features × n_inputs`.
//! Row `i` of `W_dec` is the direction of feature `i` in embedding space.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{FeatureError, FeatureResult};

/// Type discriminator written into the tagged safetensors layout.
pub const PLAIN_SAE_TYPE: &str = "SparseAutoencoder";
/// Type discriminator for the gated variant.
pub const GATED_SAE_TYPE: &str = "GatedSparseAutoencoder";

/// Which encoder nonlinearity a model uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaeKind {
    Plain,
    Gated,
}

impl SaeKind {
    /// Resolve the discriminator stored in file metadata.
    pub fn from_type_name(name: &str) -> FeatureResult<Self> {
        match name {
            PLAIN_SAE_TYPE => Ok(SaeKind::Plain),
            GATED_SAE_TYPE => Ok(SaeKind::Gated),
            other => Err(FeatureError::InvalidSaeType(other.to_string())),
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            SaeKind::Plain => PLAIN_SAE_TYPE,
            SaeKind::Gated => GATED_SAE_TYPE,
        }
    }
}

/// Model header stored as JSON under the `config` metadata key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaeConfig {
    #[serde(rename = "type")]
    pub sae_type: String,
    pub n_inputs: usize,
    pub n_features: usize,
}

/// A flat f32 tensor ready to be written out.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTensor {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl NamedTensor {
    pub fn vector(name: &str, values: &Array1<f32>) -> Self {
        Self {
            name: name.to_string(),
            shape: vec![values.len()],
            data: values.iter().copied().collect(),
        }
    }

    pub fn matrix(name: &str, values: &Array2<f32>) -> Self {
        Self {
            name: name.to_string(),
            shape: values.shape().to_vec(),
            data: values.as_standard_layout().iter().copied().collect(),
        }
    }
}

/// Shared inference surface of both autoencoder variants.
pub trait FeatureModel: Send + Sync {
    /// Embedding dimension `D`.
    fn n_inputs(&self) -> usize;
    /// Number of learned features `F`.
    fn n_features(&self) -> usize;
    /// Map a `D`-vector to `F` non-negative activations.
    fn encode(&self, x: ArrayView1<'_, f32>) -> FeatureResult<Array1<f32>>;
    /// Map `F` activations back to a `D`-vector.
    fn decode(&self, f: ArrayView1<'_, f32>) -> FeatureResult<Array1<f32>>;
}

fn check_len(expected: usize, actual: usize) -> FeatureResult<()> {
    if expected != actual {
        return Err(FeatureError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

fn check_shape(name: &str, actual: &[usize], expected: &[usize]) -> FeatureResult<()> {
    if actual != expected {
        return Err(FeatureError::ShapeMismatch {
            name: name.to_string(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}

/// L2 norm of every decoder row. Dead features with an all-zero row report
/// `1.0` so rescaling leaves them untouched.
fn decoder_row_norms(w_dec: &Array2<f32>) -> Array1<f32> {
    w_dec.map_axis(Axis(1), |row| {
        let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            norm
        } else {
            1.0
        }
    })
}

fn decode_with(w_dec: &Array2<f32>, b_dec: &Array1<f32>, f: ArrayView1<'_, f32>) -> Array1<f32> {
    f.dot(w_dec) + b_dec
}

/// Baseline sparse autoencoder.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseAutoencoder {
    pub(crate) w_enc: Array2<f32>,
    pub(crate) b_enc: Array1<f32>,
    pub(crate) w_dec: Array2<f32>,
    pub(crate) b_dec: Array1<f32>,
    pub(crate) prescaler: f32,
}

impl SparseAutoencoder {
    /// Assemble a model from its four parameter tensors.
    pub fn from_parts(
        w_enc: Array2<f32>,
        b_enc: Array1<f32>,
        w_dec: Array2<f32>,
        b_dec: Array1<f32>,
    ) -> FeatureResult<Self> {
        let (n_inputs, n_features) = w_enc.dim();
        check_shape("b_enc", b_enc.shape(), &[n_features])?;
        check_shape("W_dec", w_dec.shape(), &[n_features, n_inputs])?;
        check_shape("b_dec", b_dec.shape(), &[n_inputs])?;
        Ok(Self {
            w_enc,
            b_enc,
            w_dec,
            b_dec,
            prescaler: 1.0,
        })
    }

    pub fn prescaler(&self) -> f32 {
        self.prescaler
    }

    /// Input scale applied during training; folded into the biases on export.
    pub fn set_prescaler(&mut self, prescaler: f32) {
        self.prescaler = prescaler;
    }

    /// Feature directions, one row per feature.
    pub fn decoder(&self) -> ArrayView2<'_, f32> {
        self.w_dec.view()
    }

    /// Rescale so every decoder row has unit norm, moving the scale into the encoder.
    pub fn normalize_decoder_weights(&mut self) {
        let norms = decoder_row_norms(&self.w_dec);
        self.w_enc *= &norms;
        self.b_enc *= &norms;
        self.w_dec /= &norms.view().insert_axis(Axis(1));
    }

    /// Decoder-normalized parameters with the prescaler folded into the biases.
    pub fn export(&self) -> (SaeConfig, Vec<NamedTensor>) {
        let norms = decoder_row_norms(&self.w_dec);
        let w_enc = &self.w_enc * &norms;
        let b_enc = &self.b_enc * &norms / self.prescaler;
        let w_dec = &self.w_dec / &norms.view().insert_axis(Axis(1));
        let b_dec = &self.b_dec / self.prescaler;

        let config = SaeConfig {
            sae_type: PLAIN_SAE_TYPE.to_string(),
            n_inputs: self.n_inputs(),
            n_features: self.n_features(),
        };
        let tensors = vec![
            NamedTensor::matrix("W_enc", &w_enc),
            NamedTensor::vector("b_enc", &b_enc),
            NamedTensor::matrix("W_dec", &w_dec),
            NamedTensor::vector("b_dec", &b_dec),
        ];
        (config, tensors)
    }
}

impl FeatureModel for SparseAutoencoder {
    fn n_inputs(&self) -> usize {
        self.w_enc.nrows()
    }

    fn n_features(&self) -> usize {
        self.w_enc.ncols()
    }

    fn encode(&self, x: ArrayView1<'_, f32>) -> FeatureResult<Array1<f32>> {
        check_len(self.n_inputs(), x.len())?;
        let pre = x.dot(&self.w_enc) + &self.b_enc;
        Ok(pre.mapv(|v| v.max(0.0)))
    }

    fn decode(&self, f: ArrayView1<'_, f32>) -> FeatureResult<Array1<f32>> {
        check_len(self.n_features(), f.len())?;
        Ok(decode_with(&self.w_dec, &self.b_dec, f))
    }
}

/// Gated sparse autoencoder with a hard gate on a separate pre-activation path.
#[derive(Debug, Clone, PartialEq)]
pub struct GatedSparseAutoencoder {
    pub(crate) w_enc: Array2<f32>,
    pub(crate) b_enc: Array1<f32>,
    pub(crate) b_gate: Array1<f32>,
    pub(crate) r_gate: Array1<f32>,
    pub(crate) w_dec: Array2<f32>,
    pub(crate) b_dec: Array1<f32>,
    pub(crate) prescaler: f32,
}

impl GatedSparseAutoencoder {
    pub fn from_parts(
        w_enc: Array2<f32>,
        b_enc: Array1<f32>,
        b_gate: Array1<f32>,
        r_gate: Array1<f32>,
        w_dec: Array2<f32>,
        b_dec: Array1<f32>,
    ) -> FeatureResult<Self> {
        let (n_inputs, n_features) = w_enc.dim();
        check_shape("b_enc", b_enc.shape(), &[n_features])?;
        check_shape("b_gate", b_gate.shape(), &[n_features])?;
        check_shape("r_gate", r_gate.shape(), &[n_features])?;
        check_shape("W_dec", w_dec.shape(), &[n_features, n_inputs])?;
        check_shape("b_dec", b_dec.shape(), &[n_inputs])?;
        Ok(Self {
            w_enc,
            b_enc,
            b_gate,
            r_gate,
            w_dec,
            b_dec,
            prescaler: 1.0,
        })
    }

    pub fn prescaler(&self) -> f32 {
        self.prescaler
    }

    pub fn set_prescaler(&mut self, prescaler: f32) {
        self.prescaler = prescaler;
    }

    pub fn decoder(&self) -> ArrayView2<'_, f32> {
        self.w_dec.view()
    }

    /// Same rescaling as the plain variant; the gate bias scales with the encoder.
    pub fn normalize_decoder_weights(&mut self) {
        let norms = decoder_row_norms(&self.w_dec);
        self.w_enc *= &norms;
        self.b_enc *= &norms;
        self.b_gate *= &norms;
        self.w_dec /= &norms.view().insert_axis(Axis(1));
    }

    pub fn export(&self) -> (SaeConfig, Vec<NamedTensor>) {
        let norms = decoder_row_norms(&self.w_dec);
        let w_enc = &self.w_enc * &norms;
        let b_enc = &self.b_enc * &norms / self.prescaler;
        let b_gate = &self.b_gate * &norms / self.prescaler;
        let w_dec = &self.w_dec / &norms.view().insert_axis(Axis(1));
        let b_dec = &self.b_dec / self.prescaler;

        let config = SaeConfig {
            sae_type: GATED_SAE_TYPE.to_string(),
            n_inputs: self.n_inputs(),
            n_features: self.n_features(),
        };
        let tensors = vec![
            NamedTensor::matrix("W_enc", &w_enc),
            NamedTensor::vector("b_enc", &b_enc),
            NamedTensor::vector("b_gate", &b_gate),
            NamedTensor::vector("r_gate", &self.r_gate),
            NamedTensor::matrix("W_dec", &w_dec),
            NamedTensor::vector("b_dec", &b_dec),
        ];
        (config, tensors)
    }
}

impl FeatureModel for GatedSparseAutoencoder {
    fn n_inputs(&self) -> usize {
        self.w_enc.nrows()
    }

    fn n_features(&self) -> usize {
        self.w_enc.ncols()
    }

    fn encode(&self, x: ArrayView1<'_, f32>) -> FeatureResult<Array1<f32>> {
        check_len(self.n_inputs(), x.len())?;
        let centered = &x - &self.b_dec;
        let pre = centered.dot(&self.w_enc);

        let mut out = Array1::<f32>::zeros(self.n_features());
        Zip::from(&mut out)
            .and(&pre)
            .and(&self.b_enc)
            .and(&self.b_gate)
            .and(&self.r_gate)
            .for_each(|out, &pre, &b_enc, &b_gate, &r_gate| {
                let gate = pre * r_gate.exp() + b_gate;
                if gate > 0.0 {
                    *out = (pre + b_enc).max(0.0);
                }
            });
        Ok(out)
    }

    fn decode(&self, f: ArrayView1<'_, f32>) -> FeatureResult<Array1<f32>> {
        check_len(self.n_features(), f.len())?;
        Ok(decode_with(&self.w_dec, &self.b_dec, f))
    }
}

/// Either autoencoder variant, as loaded from disk.
#[derive(Debug, Clone, PartialEq)]
pub enum Sae {
    Plain(SparseAutoencoder),
    Gated(GatedSparseAutoencoder),
}

impl Sae {
    pub fn kind(&self) -> SaeKind {
        match self {
            Sae::Plain(_) => SaeKind::Plain,
            Sae::Gated(_) => SaeKind::Gated,
        }
    }

    pub fn decoder(&self) -> ArrayView2<'_, f32> {
        match self {
            Sae::Plain(m) => m.decoder(),
            Sae::Gated(m) => m.decoder(),
        }
    }

    pub fn normalize_decoder_weights(&mut self) {
        match self {
            Sae::Plain(m) => m.normalize_decoder_weights(),
            Sae::Gated(m) => m.normalize_decoder_weights(),
        }
    }

    pub fn export(&self) -> (SaeConfig, Vec<NamedTensor>) {
        match self {
            Sae::Plain(m) => m.export(),
            Sae::Gated(m) => m.export(),
        }
    }
}

impl FeatureModel for Sae {
    fn n_inputs(&self) -> usize {
        match self {
            Sae::Plain(m) => m.n_inputs(),
            Sae::Gated(m) => m.n_inputs(),
        }
    }

    fn n_features(&self) -> usize {
        match self {
            Sae::Plain(m) => m.n_features(),
            Sae::Gated(m) => m.n_features(),
        }
    }

    fn encode(&self, x: ArrayView1<'_, f32>) -> FeatureResult<Array1<f32>> {
        match self {
            Sae::Plain(m) => m.encode(x),
            Sae::Gated(m) => m.encode(x),
        }
    }

    fn decode(&self, f: ArrayView1<'_, f32>) -> FeatureResult<Array1<f32>> {
        match self {
            Sae::Plain(m) => m.decode(f),
            Sae::Gated(m) => m.decode(f),
        }
    }
}

impl From<SparseAutoencoder> for Sae {
    fn from(model: SparseAutoencoder) -> Self {
        Sae::Plain(model)
    }
}

impl From<GatedSparseAutoencoder> for Sae {
    fn from(model: GatedSparseAutoencoder) -> Self {
        Sae::Gated(model)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ndarray::array;

    /// 3 inputs, 2 features, decoder rows of norm 2 and 4.
    pub(crate) fn plain_fixture() -> SparseAutoencoder {
        SparseAutoencoder::from_parts(
            array![[1.0f32, 0.0], [0.0, 1.0], [1.0, -1.0]],
            array![0.5f32, -0.5],
            array![[2.0f32, 0.0, 0.0], [0.0, 0.0, 4.0]],
            array![0.1f32, 0.2, 0.3],
        )
        .unwrap()
    }

    pub(crate) fn gated_fixture() -> GatedSparseAutoencoder {
        GatedSparseAutoencoder::from_parts(
            array![[1.0f32, 0.0], [0.0, 1.0], [1.0, -1.0]],
            array![0.5f32, -0.5],
            array![0.0f32, -10.0],
            array![0.0f32, 0.0],
            array![[2.0f32, 0.0, 0.0], [0.0, 0.0, 4.0]],
            array![0.0f32, 0.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn plain_encode_applies_relu() {
        let sae = plain_fixture();
        // x·W_enc = [1+3, 2-3] = [4, -1]; + b_enc = [4.5, -1.5]; relu -> [4.5, 0]
        let f = sae.encode(array![1.0f32, 2.0, 3.0].view()).unwrap();
        assert_eq!(f, array![4.5f32, 0.0]);
    }

    #[test]
    fn plain_decode_is_affine() {
        let sae = plain_fixture();
        let x = sae.decode(array![1.0f32, 0.5].view()).unwrap();
        assert_eq!(x, array![2.1f32, 0.2, 2.3]);
    }

    #[test]
    fn encode_rejects_wrong_dimension() {
        let sae = plain_fixture();
        let err = sae.encode(array![1.0f32, 2.0].view()).unwrap_err();
        assert!(matches!(
            err,
            FeatureError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn from_parts_checks_shapes() {
        let err = SparseAutoencoder::from_parts(
            Array2::zeros((3, 2)),
            Array1::zeros(2),
            Array2::zeros((3, 2)),
            Array1::zeros(3),
        )
        .unwrap_err();
        assert!(matches!(err, FeatureError::ShapeMismatch { ref name, .. } if name == "W_dec"));
    }

    #[test]
    fn gated_encode_uses_hard_gate() {
        let sae = gated_fixture();
        // pre = [4, -1]; mag = relu(pre + b_enc) = [4.5, 0]
        // gate = pre*1 + b_gate = [4, -11] -> only feature 0 passes
        let f = sae.encode(array![1.0f32, 2.0, 3.0].view()).unwrap();
        assert_eq!(f, array![4.5f32, 0.0]);
    }

    #[test]
    fn gated_gate_can_close_positive_magnitude() {
        let mut sae = gated_fixture();
        sae.b_gate = array![-100.0f32, -10.0];
        let f = sae.encode(array![1.0f32, 2.0, 3.0].view()).unwrap();
        assert_eq!(f, array![0.0f32, 0.0]);
    }

    #[test]
    fn gated_encode_centers_on_decoder_bias() {
        let mut sae = gated_fixture();
        sae.b_dec = array![1.0f32, 2.0, 3.0];
        let f = sae.encode(array![1.0f32, 2.0, 3.0].view()).unwrap();
        // centered input is zero: pre = 0, gate = b_gate = [0, -10] -> closed
        assert_eq!(f, array![0.0f32, 0.0]);
    }

    #[test]
    fn activations_are_never_negative() {
        let sae = plain_fixture();
        for x in [
            array![-5.0f32, 3.0, 0.5],
            array![0.0f32, 0.0, 0.0],
            array![9.0f32, -9.0, 1.0],
        ] {
            let f = sae.encode(x.view()).unwrap();
            assert!(f.iter().all(|&v| v >= 0.0));
        }
    }

    #[test]
    fn normalize_gives_unit_decoder_rows() {
        let mut sae = plain_fixture();
        sae.normalize_decoder_weights();
        for row in sae.decoder().outer_iter() {
            let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-6);
        }
        // encoder columns scale by the old norms (2 and 4)
        assert_eq!(sae.w_enc.column(0), array![2.0f32, 0.0, 2.0]);
        assert_eq!(sae.w_enc.column(1), array![0.0f32, 4.0, -4.0]);
        assert_eq!(sae.b_enc, array![1.0f32, -2.0]);
    }

    #[test]
    fn normalize_preserves_reconstruction() {
        let mut sae = plain_fixture();
        let x = array![0.3f32, -0.7, 1.1];
        let before = sae.decode(sae.encode(x.view()).unwrap().view()).unwrap();
        sae.normalize_decoder_weights();
        let after = sae.decode(sae.encode(x.view()).unwrap().view()).unwrap();
        for (a, b) in before.iter().zip(after.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn gated_normalize_scales_gate_bias() {
        let mut sae = gated_fixture();
        sae.b_gate = array![1.0f32, 1.0];
        sae.normalize_decoder_weights();
        assert_eq!(sae.b_gate, array![2.0f32, 4.0]);
        assert_eq!(sae.r_gate, array![0.0f32, 0.0]);
    }

    #[test]
    fn export_folds_prescaler_into_biases() {
        let mut sae = plain_fixture();
        sae.set_prescaler(2.0);
        let (config, tensors) = sae.export();

        assert_eq!(config.sae_type, PLAIN_SAE_TYPE);
        assert_eq!((config.n_inputs, config.n_features), (3, 2));

        let get = |name: &str| tensors.iter().find(|t| t.name == name).unwrap().clone();
        // b_enc * norms / prescaler = [0.5*2, -0.5*4] / 2
        assert_eq!(get("b_enc").data, vec![0.5, -1.0]);
        assert_eq!(get("b_dec").data, vec![0.05, 0.1, 0.15]);
        assert_eq!(get("W_dec").shape, vec![2, 3]);
        assert_eq!(get("W_dec").data, vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        // export leaves the live model untouched
        assert_eq!(sae.w_dec[[0, 0]], 2.0);
    }

    #[test]
    fn gated_export_carries_all_six_tensors() {
        let (config, tensors) = gated_fixture().export();
        assert_eq!(config.sae_type, GATED_SAE_TYPE);
        let names: Vec<&str> = tensors.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["W_enc", "b_enc", "b_gate", "r_gate", "W_dec", "b_dec"]);
    }

    #[test]
    fn kind_dispatch_rejects_unknown_type() {
        assert_eq!(
            SaeKind::from_type_name("SparseAutoencoder").unwrap(),
            SaeKind::Plain
        );
        assert_eq!(
            SaeKind::from_type_name("GatedSparseAutoencoder").unwrap(),
            SaeKind::Gated
        );
        let err = SaeKind::from_type_name("TopK").unwrap_err();
        assert_eq!(err.to_string(), "invalid SAE type: TopK");
    }

    #[test]
    fn enum_forwards_to_variant() {
        let sae: Sae = plain_fixture().into();
        assert_eq!(sae.kind(), SaeKind::Plain);
        assert_eq!(sae.n_inputs(), 3);
        assert_eq!(sae.n_features(), 2);
        assert_eq!(sae.decoder().nrows(), 2);
    }
}
