use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::{
    IrradianceErr, Phase, Result,
    archive::{self, NpzArchive},
};

/// File, under the data root, holding the per-channel target statistics.
pub const EVE_STATS_FILE: &str = "eve_stats.npz";

/// The samples a model runs over.
///
/// Inputs are already pre-processed: decoding and normalizing the images happens upstream.
pub trait InferenceDataset {
    /// Model inputs, one sample per row.
    fn inputs(&self) -> ArrayView2<'_, f32>;

    /// Per-channel means of the targets the model was trained on.
    fn eve_means(&self) -> ArrayView1<'_, f64>;

    /// Per-channel standard deviations of the targets the model was trained on.
    fn eve_stds(&self) -> ArrayView1<'_, f64>;

    /// Ground truth in physical units, when known.
    fn eve(&self) -> Option<ArrayView2<'_, f64>>;

    fn len(&self) -> usize {
        self.inputs().nrows()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A dataset stored as `.npy` files under a data root.
///
/// Layout:
/// - `aia_<phase>.npy`: model inputs.
/// - `eve_stats.npz`: `mean` and `std`, one value per channel.
/// - `eve_<phase>.npy`: ground truth, only read when asked for.
#[derive(Debug, Clone)]
pub struct NpyDataset {
    inputs: Array2<f32>,
    means: Array1<f64>,
    stds: Array1<f64>,
    eve: Option<Array2<f64>>,
}

impl NpyDataset {
    /// Creates a new `NpyDataset` from its arrays.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if the statistics don't have the same length or the ground truth
    /// doesn't have one row per input and one column per channel.
    pub fn new(
        inputs: Array2<f32>,
        means: Array1<f64>,
        stds: Array1<f64>,
        eve: Option<Array2<f64>>,
    ) -> Result<Self> {
        if stds.len() != means.len() {
            return Err(IrradianceErr::ShapeMismatch {
                what: "eve stds",
                got: stds.len(),
                expected: means.len(),
            });
        }

        if let Some(eve) = &eve {
            if eve.nrows() != inputs.nrows() {
                return Err(IrradianceErr::ShapeMismatch {
                    what: "eve rows",
                    got: eve.nrows(),
                    expected: inputs.nrows(),
                });
            }
            if eve.ncols() != means.len() {
                return Err(IrradianceErr::ShapeMismatch {
                    what: "eve channels",
                    got: eve.ncols(),
                    expected: means.len(),
                });
            }
        }

        Ok(Self {
            inputs,
            means,
            stds,
            eve,
        })
    }

    /// Reads the split `phase` from `data_root`.
    ///
    /// # Arguments
    /// * `data_root` - The directory holding the dataset files.
    /// * `phase` - The split to read.
    /// * `with_truth` - Whether to read the ground truth too.
    pub fn open<P: AsRef<Path>>(data_root: P, phase: Phase, with_truth: bool) -> Result<Self> {
        let root = data_root.as_ref();

        let inputs = archive::read_array_f32(root.join(format!("aia_{phase}.npy")))?;
        let inputs = archive::into_matrix(inputs, "inputs")?;

        let mut stats = NpzArchive::open(root.join(EVE_STATS_FILE))?;
        let means = stats.vector("mean")?;
        let stds = stats.vector("std")?;

        let eve = if with_truth {
            let eve = archive::read_array(root.join(format!("eve_{phase}.npy")))?;
            Some(archive::into_matrix(eve, "eve")?)
        } else {
            None
        };

        log::info!(
            "read {} {phase} sample(s) with {} feature(s) from {}",
            inputs.nrows(),
            inputs.ncols(),
            root.display()
        );

        Self::new(inputs, means, stds, eve)
    }

    pub fn channels(&self) -> usize {
        self.means.len()
    }
}

impl InferenceDataset for NpyDataset {
    fn inputs(&self) -> ArrayView2<'_, f32> {
        self.inputs.view()
    }

    fn eve_means(&self) -> ArrayView1<'_, f64> {
        self.means.view()
    }

    fn eve_stds(&self) -> ArrayView1<'_, f64> {
        self.stds.view()
    }

    fn eve(&self) -> Option<ArrayView2<'_, f64>> {
        self.eve.as_ref().map(Array2::view)
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use ndarray::array;
    use ndarray_npy::{NpzWriter, write_npy};

    use super::*;

    fn write_root(root: &Path) {
        write_npy(root.join("aia_val.npy"), &array![[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]])
            .unwrap();
        write_npy(root.join("eve_val.npy"), &array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();

        let mut npz = NpzWriter::new(File::create(root.join(EVE_STATS_FILE)).unwrap());
        npz.add_array("mean", &array![0.5, 1.5]).unwrap();
        npz.add_array("std", &array![2.0, 3.0]).unwrap();
        npz.finish().unwrap();
    }

    #[test]
    fn opens_split_with_and_without_truth() {
        let dir = tempfile::tempdir().unwrap();
        write_root(dir.path());

        let ds = NpyDataset::open(dir.path(), Phase::Val, true).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.channels(), 2);
        assert_eq!(ds.eve_means(), array![0.5, 1.5]);
        assert_eq!(ds.eve().unwrap().row(2), array![5.0, 6.0]);

        let ds = NpyDataset::open(dir.path(), Phase::Val, false).unwrap();
        assert!(ds.eve().is_none());
    }

    #[test]
    fn missing_split_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_root(dir.path());
        assert!(NpyDataset::open(dir.path(), Phase::Test, false).is_err());
    }

    #[test]
    fn truth_must_match_inputs() {
        let err = NpyDataset::new(
            Array2::zeros((3, 4)),
            Array1::zeros(2),
            Array1::ones(2),
            Some(Array2::zeros((2, 2))),
        )
        .unwrap_err();
        assert!(matches!(err, IrradianceErr::ShapeMismatch { what: "eve rows", .. }));
    }
}
