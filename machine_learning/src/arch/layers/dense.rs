use ndarray::{linalg, prelude::*};

use crate::{MlErr, Result, arch::activations::ActFn};

/// A fully connected layer: `a = act_fn(x · w + b)`.
#[derive(Debug, Clone)]
pub struct Dense {
    dim: (usize, usize),
    weights: Array2<f32>,
    biases: Array1<f32>,
    act_fn: Option<ActFn>,
}

impl Dense {
    /// Creates a new `Dense` layer from its trained parameters.
    ///
    /// # Arguments
    /// * `weights` - An `n x m` matrix, `n` inputs and `m` outputs.
    /// * `biases` - One bias per output.
    /// * `act_fn` - The activation applied to the output, if any.
    ///
    /// # Returns
    /// A new `Dense` instance or an error if the biases don't match the weights.
    pub fn new(weights: Array2<f32>, biases: Array1<f32>, act_fn: Option<ActFn>) -> Result<Self> {
        let dim = weights.dim();

        if biases.len() != dim.1 {
            return Err(MlErr::SizeMismatch {
                a: "biases",
                b: "weight columns",
                got: biases.len(),
                expected: dim.1,
            });
        }

        Ok(Self {
            dim,
            weights,
            biases,
            act_fn,
        })
    }

    /// Returns the `(inputs, outputs)` dimension of this layer.
    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        (self.dim.0 + 1) * self.dim.1
    }

    pub fn weights(&self) -> ArrayView2<'_, f32> {
        self.weights.view()
    }

    pub fn biases(&self) -> ArrayView1<'_, f32> {
        self.biases.view()
    }

    pub fn act_fn(&self) -> Option<&ActFn> {
        self.act_fn.as_ref()
    }

    /// Makes a forward pass through this layer.
    ///
    /// # Arguments
    /// * `x` - A batch with one sample per row.
    ///
    /// # Returns
    /// The activations for the batch or an error if `x` has the wrong amount of columns.
    pub fn forward(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.dim.0 {
            return Err(MlErr::SizeMismatch {
                a: "input columns",
                b: "layer inputs",
                got: x.ncols(),
                expected: self.dim.0,
            });
        }

        let mut z = Array2::zeros((x.nrows(), self.dim.1));
        linalg::general_mat_mul(1.0, &x, &self.weights, 0.0, &mut z);
        z += &self.biases;

        if let Some(act_fn) = &self.act_fn {
            z.mapv_inplace(|z| act_fn.f(z));
        }

        Ok(z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_adds_biases_to_every_row() {
        let layer = Dense::new(array![[2.0], [1.0]], array![10.0], None).unwrap();
        let y = layer.forward(array![[1.0, 1.0], [0.0, 3.0], [0.0, 0.0]].view()).unwrap();
        assert_eq!(y, array![[13.0], [13.0], [10.0]]);
    }

    #[test]
    fn biases_must_match_weight_columns() {
        let err = Dense::new(
            array![[100.0], [-100.0]],
            array![0.0, 0.0],
            Some(ActFn::sigmoid(2.0)),
        )
        .unwrap_err();
        assert!(matches!(err, MlErr::SizeMismatch { got: 2, expected: 1, .. }));
    }

    #[test]
    fn forward_rejects_wrong_width() {
        let layer = Dense::new(Array2::zeros((3, 1)), Array1::zeros(1), None).unwrap();
        let err = layer.forward(Array2::zeros((4, 2)).view()).unwrap_err();
        assert!(matches!(err, MlErr::SizeMismatch { got: 2, expected: 3, .. }));
    }
}
