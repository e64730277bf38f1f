use ndarray::{Array2, ArrayView2};

use crate::error::Result;

pub trait Model {
    /// Returns the amount of features every input row must have.
    fn input_size(&self) -> usize;

    /// Returns the amount of values produced for every input row.
    fn output_size(&self) -> usize;

    /// Makes a forward pass over a batch of rows.
    ///
    /// # Arguments
    /// * `x` - The input batch, one sample per row.
    ///
    /// # Returns
    /// One output row per input row, in the same order, or an error if the batch doesn't fit the
    /// model.
    fn forward(&self, x: ArrayView2<f32>) -> Result<Array2<f32>>;
}
