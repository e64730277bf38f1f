//! The linear model whose predictions the residual network corrects.

use std::path::Path;

use ndarray::{Array1, Array2, ArrayView2, s};

use crate::{IrradianceErr, Result, archive::NpzArchive};

/// File, under the data root, holding the linear model.
pub const MODEL_FILE: &str = "residual_initial_model.npz";

/// File, under the data root, holding the linear model's inputs.
pub const FEATURES_FILE: &str = "mean_std_feats.npz";

/// A standardize-then-project linear model: `[(x - mu) / sig, 1] · wᵀ`.
#[derive(Debug, Clone)]
pub struct LinearBaseline {
    mu: Array1<f64>,
    sig: Array1<f64>,
    weights: Array2<f64>,
}

impl LinearBaseline {
    /// Creates a new `LinearBaseline`.
    ///
    /// # Arguments
    /// * `mu` - Per-feature means.
    /// * `sig` - Per-feature standard deviations.
    /// * `weights` - A `channels x (features + 1)` matrix, the last column being the intercept.
    ///
    /// # Returns
    /// A new `LinearBaseline` or an error if the sizes don't agree.
    pub fn new(mu: Array1<f64>, sig: Array1<f64>, weights: Array2<f64>) -> Result<Self> {
        if sig.len() != mu.len() {
            return Err(IrradianceErr::ShapeMismatch {
                what: "baseline sig",
                got: sig.len(),
                expected: mu.len(),
            });
        }

        if weights.ncols() != mu.len() + 1 {
            return Err(IrradianceErr::ShapeMismatch {
                what: "baseline weight columns",
                got: weights.ncols(),
                expected: mu.len() + 1,
            });
        }

        Ok(Self { mu, sig, weights })
    }

    /// Reads the `mu`, `sig` and `model` arrays of an archive.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut npz = NpzArchive::open(path)?;
        Self::new(npz.vector("mu")?, npz.vector("sig")?, npz.matrix("model")?)
    }

    /// Amount of features every input row must have.
    pub fn features(&self) -> usize {
        self.mu.len()
    }

    /// Amount of channels predicted for every row.
    pub fn channels(&self) -> usize {
        self.weights.nrows()
    }

    /// Predicts every row of `x`.
    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.features() {
            return Err(IrradianceErr::ShapeMismatch {
                what: "baseline features",
                got: x.ncols(),
                expected: self.features(),
            });
        }

        let z = (&x - &self.mu) / &self.sig;
        Ok(add_one(z.view()).dot(&self.weights.t()))
    }
}

/// Appends a column of ones to `x`.
pub fn add_one(x: ArrayView2<f64>) -> Array2<f64> {
    let (n, f) = x.dim();
    let mut out = Array2::ones((n, f + 1));
    out.slice_mut(s![.., ..f]).assign(&x);
    out
}

/// Reads the feature matrix stored under `key` in the features archive.
pub fn load_features<P: AsRef<Path>>(path: P, key: &str) -> Result<Array2<f64>> {
    NpzArchive::open(path)?.matrix(key)
}
