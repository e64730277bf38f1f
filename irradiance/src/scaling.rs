//! Inverts the normalization applied to the EVE targets before training.

use ndarray::{Array2, ArrayView1};

use crate::{EveTransform, IrradianceErr, Result, RunConfig};

/// Raw network outputs are this many times larger than the scaled targets.
pub const MODEL_OUTPUT_SCALE: f64 = 100.0;

/// Inverse of the logistic sigmoid.
pub fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Brings predictions back to physical units.
///
/// Without `zscore`, `mean` is a per-channel scale factor and `std` is unused. With it, the
/// inverse pipeline is applied in order: de-standardize, then invert the sigmoid, then invert the
/// power/log transform. Unknown transforms are left as identity.
///
/// # Arguments
/// * `y` - Predictions in the scaled space, one row per sample and one column per channel.
/// * `mean` - Per-channel means (or scale factors).
/// * `std` - Per-channel standard deviations.
/// * `transform` - The transform applied before training.
/// * `sigmoid` - Whether a sigmoid was applied after standardizing.
/// * `zscore` - Whether the targets were standardized.
///
/// # Returns
/// The unscaled predictions or an error if the statistics don't have one value per channel.
pub fn unscale(
    mut y: Array2<f64>,
    mean: ArrayView1<f64>,
    std: ArrayView1<f64>,
    transform: &EveTransform,
    sigmoid: bool,
    zscore: bool,
) -> Result<Array2<f64>> {
    check_channels("eve means", mean.len(), y.ncols())?;

    if !zscore {
        y *= &mean;
        return Ok(y);
    }

    check_channels("eve stds", std.len(), y.ncols())?;

    y *= &std;
    y += &mean;

    if sigmoid {
        y.mapv_inplace(logit);
    }

    match transform {
        EveTransform::Sqrt => y.mapv_inplace(|v| v.powi(2)),
        EveTransform::Log => y.mapv_inplace(f64::exp_m1),
        EveTransform::None | EveTransform::Unknown(_) => {}
    }

    Ok(y)
}

impl RunConfig {
    /// Unscales raw network outputs following this configuration.
    ///
    /// The outputs are first divided by [`MODEL_OUTPUT_SCALE`].
    pub fn unscale_outputs(
        &self,
        outputs: Array2<f64>,
        mean: ArrayView1<f64>,
        std: ArrayView1<f64>,
    ) -> Result<Array2<f64>> {
        unscale(
            outputs / MODEL_OUTPUT_SCALE,
            mean,
            std,
            &self.eve_transform,
            self.eve_sigmoid,
            self.zscore,
        )
    }
}

fn check_channels(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(IrradianceErr::ShapeMismatch {
            what,
            got,
            expected,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, array};

    use super::*;

    const TOL: f64 = 1e-9;

    /// The pre-processing applied to targets during training.
    fn scale(
        y: &Array2<f64>,
        mean: &Array1<f64>,
        std: &Array1<f64>,
        transform: &EveTransform,
        sigmoid: bool,
        zscore: bool,
    ) -> Array2<f64> {
        if !zscore {
            return y / mean;
        }

        let mut y = y.clone();
        match transform {
            EveTransform::Sqrt => y.mapv_inplace(f64::sqrt),
            EveTransform::Log => y.mapv_inplace(f64::ln_1p),
            _ => {}
        }
        if sigmoid {
            y.mapv_inplace(|v| 1.0 / (1.0 + (-v).exp()));
        }
        (y - mean) / std
    }

    fn assert_close(a: &Array2<f64>, b: &Array2<f64>) {
        assert_eq!(a.dim(), b.dim());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() <= TOL * y.abs().max(1.0), "{x} != {y}");
        }
    }

    #[test]
    fn inverts_every_preprocessing_combination() {
        let y = array![[0.2, 1.5, 3.0], [0.9, 0.05, 2.5], [0.4, 0.7, 1.1]];
        let mean = array![0.3, 0.8, 1.2];
        let std = array![0.5, 2.0, 0.25];
        let transforms = [EveTransform::None, EveTransform::Sqrt, EveTransform::Log];

        for zscore in [true, false] {
            for sigmoid in [true, false] {
                for transform in &transforms {
                    let scaled = scale(&y, &mean, &std, transform, sigmoid, zscore);
                    let back = unscale(scaled, mean.view(), std.view(), transform, sigmoid, zscore)
                        .unwrap();
                    assert_close(&back, &y);
                }
            }
        }
    }

    #[test]
    fn sqrt_matches_closed_form() {
        let y = array![[1.0, -2.0], [0.5, 3.0]];
        let (m, s) = (array![10.0, 1.0], array![2.0, 0.5]);

        let got = unscale(y.clone(), m.view(), s.view(), &EveTransform::Sqrt, false, true).unwrap();
        let expected = (&y * &s + &m).mapv(|v| v.powi(2));
        assert_close(&got, &expected);
    }

    #[test]
    fn without_zscore_mean_is_a_scale_factor() {
        let y = array![[1.0, 2.0], [3.0, 4.0]];
        let mean = array![10.0, 0.5];
        let std = Array1::zeros(7);

        let got = unscale(y, mean.view(), std.view(), &EveTransform::Log, true, false).unwrap();
        assert_eq!(got, array![[10.0, 1.0], [30.0, 2.0]]);
    }

    #[test]
    fn unknown_transform_is_identity() {
        let y = array![[0.25, 4.0]];
        let (m, s) = (array![1.0, 0.0], array![2.0, 1.0]);
        let unknown = EveTransform::Unknown("cbrt".into());

        let a = unscale(y.clone(), m.view(), s.view(), &unknown, false, true).unwrap();
        let b = unscale(y, m.view(), s.view(), &EveTransform::None, false, true).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, array![[1.5, 4.0]]);
    }

    #[test]
    fn wrong_channel_count_is_rejected() {
        let y = Array2::zeros((3, 2));
        let err = unscale(
            y,
            array![1.0, 2.0, 3.0].view(),
            array![1.0, 1.0].view(),
            &EveTransform::None,
            false,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, IrradianceErr::ShapeMismatch { got: 3, expected: 2, .. }));
    }

    #[test]
    fn outputs_are_divided_before_unscaling() {
        let cfg = RunConfig {
            zscore: true,
            eve_transform: EveTransform::Sqrt,
            eve_sigmoid: false,
        };
        let outputs = Array2::from_elem((4, 15), 200.0);
        let mean = Array1::from_elem(15, 10.0);
        let std = Array1::from_elem(15, 2.0);

        let got = cfg.unscale_outputs(outputs, mean.view(), std.view()).unwrap();
        assert!(got.iter().all(|&v| (v - 196.0).abs() < TOL));
    }
}
