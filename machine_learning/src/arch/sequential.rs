use ndarray::{Array2, ArrayView2};

use super::{Model, layers::Dense};
use crate::{MlErr, Result};

/// A sequential model: information flows forward through its layers in order.
#[derive(Debug, Clone)]
pub struct Sequential {
    layers: Vec<Dense>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance or an error if there are no layers or two adjacent layers have
    /// incompatible dimensions.
    pub fn new<I>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = Dense>,
    {
        let layers: Vec<Dense> = layers.into_iter().collect();

        if layers.is_empty() {
            return Err(MlErr::EmptyModel);
        }

        for pair in layers.windows(2) {
            let (_, m) = pair[0].dim();
            let (n, _) = pair[1].dim();

            if m != n {
                return Err(MlErr::SizeMismatch {
                    a: "layer output",
                    b: "next layer input",
                    got: n,
                    expected: m,
                });
            }
        }

        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    /// Returns the amount of parameters in the model.
    pub fn size(&self) -> usize {
        self.layers.iter().map(Dense::size).sum()
    }
}

impl Model for Sequential {
    fn input_size(&self) -> usize {
        self.layers[0].dim().0
    }

    fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].dim().1
    }

    fn forward(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut layers = self.layers.iter();

        // `new` guarantees at least one layer.
        let Some(first) = layers.next() else {
            return Err(MlErr::EmptyModel);
        };

        let mut a = first.forward(x)?;
        for layer in layers {
            a = layer.forward(a.view())?;
        }

        Ok(a)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, array};

    use super::*;
    use crate::arch::activations::ActFn;

    #[test]
    fn forward_chains_layers_in_order() {
        let l1 = Dense::new(array![[1.0, 2.0], [3.0, 4.0]], Array1::zeros(2), None).unwrap();
        let l2 = Dense::new(array![[1.0], [-1.0]], array![0.5], None).unwrap();
        let model = Sequential::new([l1, l2]).unwrap();

        let y = model.forward(array![[1.0, 1.0], [2.0, 0.0]].view()).unwrap();

        // [1,1] -> [4,6] -> -2 + 0.5 ; [2,0] -> [2,4] -> -2 + 0.5
        assert_eq!(y, array![[-1.5], [-1.5]]);
        assert_eq!(model.input_size(), 2);
        assert_eq!(model.output_size(), 1);
        assert_eq!(model.size(), 6 + 3);
    }

    #[test]
    fn incompatible_layers_are_rejected() {
        let l1 = Dense::new(Array2::zeros((2, 3)), Array1::zeros(3), None).unwrap();
        let l2 = Dense::new(Array2::zeros((2, 1)), Array1::zeros(1), None).unwrap();

        let err = Sequential::new([l1, l2]).unwrap_err();
        assert!(matches!(err, MlErr::SizeMismatch { got: 2, expected: 3, .. }));
    }

    #[test]
    fn empty_model_is_rejected() {
        assert!(matches!(Sequential::new([]), Err(MlErr::EmptyModel)));
    }

    #[test]
    fn sigmoid_output_is_bounded_by_amp() {
        let l = Dense::new(array![[100.0, -100.0]], array![0.0, 0.0], Some(ActFn::sigmoid(2.0)))
            .unwrap();
        let model = Sequential::new([l]).unwrap();
        let y = model.forward(array![[1.0]].view()).unwrap();

        assert!((y[[0, 0]] - 2.0).abs() < 1e-6);
        assert!(y[[0, 1]].abs() < 1e-6);
    }
}
