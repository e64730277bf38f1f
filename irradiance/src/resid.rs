//! Per-channel error summaries, optionally split by flare activity.

use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};

use crate::{IrradianceErr, Result};

/// The channel ranked to tell flare rows apart (Fe XX).
pub const FLARE_CHANNEL: usize = 2;

/// Fraction of rows, ranked by [`FLARE_CHANNEL`], considered quiescent.
pub const DEFAULT_FLARE_PCT: f64 = 0.975;

/// Mean absolute percentage error per channel.
///
/// Entries where `mask` is set don't take part in the means. With `flare` set, rows are ranked by
/// the truth at [`FLARE_CHANNEL`] and only the top `1 - flare_pct` fraction (`Some(true)`) or the
/// bottom `flare_pct` fraction (`Some(false)`) is averaged.
///
/// # Arguments
/// * `y` - The ground truth.
/// * `y_pred` - The prediction, same shape as `y`.
/// * `mask` - Entries to leave out, same shape as `y`.
/// * `flare` - Which rows to keep, all of them if `None`.
/// * `flare_pct` - Where the flare split is made.
///
/// # Returns
/// One mean per channel, `NaN` for a channel with no usable entry.
pub fn residual(
    y: ArrayView2<f64>,
    y_pred: ArrayView2<f64>,
    mask: ArrayView2<bool>,
    flare: Option<bool>,
    flare_pct: f64,
) -> Result<Array1<f64>> {
    check_shape("prediction", y_pred.dim(), y.dim())?;
    check_shape("mask", mask.dim(), y.dim())?;

    let mut resid = Array2::zeros(y.dim());
    Zip::from(&mut resid)
        .and(&y)
        .and(&y_pred)
        .and(&mask)
        .for_each(|r, &t, &p, &m| {
            *r = if m {
                f64::NAN
            } else {
                (t - p).abs() / t.abs() * 100.0
            };
        });

    let Some(flare) = flare else {
        return Ok(nanmean_rows(resid.view(), 0..y.nrows()));
    };

    if y.ncols() <= FLARE_CHANNEL {
        return Err(IrradianceErr::ShapeMismatch {
            what: "channels for the flare split",
            got: y.ncols(),
            expected: FLARE_CHANNEL + 1,
        });
    }

    let order = rank_rows(y, FLARE_CHANNEL);
    let cutoff = flare_cutoff(y.nrows(), flare_pct);
    let keep = if flare {
        &order[cutoff..]
    } else {
        &order[..cutoff]
    };

    Ok(nanmean_rows(resid.view(), keep.iter().copied()))
}

/// Mean relative error per channel, as a fraction, leaving out rows whose truth is negative.
pub fn relative_error(truth: ArrayView2<f64>, pred: ArrayView2<f64>) -> Result<Array1<f64>> {
    check_shape("prediction", pred.dim(), truth.dim())?;

    let errors = Zip::from(&truth).and(&pred).map_collect(|&t, &p| {
        if t < 0.0 { f64::NAN } else { (p - t).abs() / t }
    });

    Ok(nanmean_rows(errors.view(), 0..truth.nrows()))
}

/// Entries with a negative truth, i.e. missing measurements.
pub fn negative_mask(truth: ArrayView2<f64>) -> Array2<bool> {
    truth.mapv(|t| t < 0.0)
}

/// Number of rows on the quiescent side of the split.
pub fn flare_cutoff(rows: usize, flare_pct: f64) -> usize {
    ((rows as f64 * flare_pct) as usize).min(rows)
}

/// Row indices sorted by the values of `channel`. Ties keep their index order.
fn rank_rows(y: ArrayView2<f64>, channel: usize) -> Vec<usize> {
    let column = y.index_axis(Axis(1), channel);
    let mut order: Vec<usize> = (0..y.nrows()).collect();
    order.sort_by(|&a, &b| column[a].total_cmp(&column[b]));
    order
}

/// Column means over the selected rows, skipping `NaN`s.
fn nanmean_rows<I>(values: ArrayView2<f64>, rows: I) -> Array1<f64>
where
    I: IntoIterator<Item = usize>,
{
    let mut sums = Array1::<f64>::zeros(values.ncols());
    let mut counts = Array1::<usize>::zeros(values.ncols());

    for i in rows {
        for ((sum, count), &v) in sums.iter_mut().zip(counts.iter_mut()).zip(values.row(i)) {
            if !v.is_nan() {
                *sum += v;
                *count += 1;
            }
        }
    }

    Zip::from(&sums).and(&counts).map_collect(|&s, &n| {
        if n == 0 { f64::NAN } else { s / n as f64 }
    })
}

fn check_shape(what: &'static str, got: (usize, usize), expected: (usize, usize)) -> Result<()> {
    if got.1 != expected.1 {
        return Err(IrradianceErr::ShapeMismatch {
            what,
            got: got.1,
            expected: expected.1,
        });
    }
    if got.0 != expected.0 {
        return Err(IrradianceErr::ShapeMismatch {
            what,
            got: got.0,
            expected: expected.0,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    const TOL: f64 = 1e-9;

    /// 1000 rows, 3 channels; the flare channel holds a permutation of 0..1000.
    fn synthetic() -> (Array2<f64>, Array2<f64>) {
        let n = 1000;
        let y = Array2::from_shape_fn((n, 3), |(i, c)| match c {
            FLARE_CHANNEL => ((i * 7919) % n) as f64 + 1.0,
            _ => 10.0 + i as f64,
        });
        // Error of 1% on every entry of a flare row, 3% elsewhere.
        let y_pred = Array2::from_shape_fn((n, 3), |(i, c)| {
            let rank = y[[i, FLARE_CHANNEL]] - 1.0;
            let pct = if rank >= 975.0 { 0.01 } else { 0.03 };
            y[[i, c]] * (1.0 + pct)
        });
        (y, y_pred)
    }

    #[test]
    fn flare_split_sizes() {
        assert_eq!(flare_cutoff(1000, DEFAULT_FLARE_PCT), 975);
        assert_eq!(1000 - flare_cutoff(1000, DEFAULT_FLARE_PCT), 25);
        assert_eq!(flare_cutoff(10, 1.5), 10);
        assert_eq!(flare_cutoff(0, DEFAULT_FLARE_PCT), 0);
    }

    #[test]
    fn flare_and_quiet_rows_are_averaged_apart() {
        let (y, y_pred) = synthetic();
        let mask = Array2::from_elem(y.dim(), false);

        let flare = residual(y.view(), y_pred.view(), mask.view(), Some(true), 0.975).unwrap();
        let quiet = residual(y.view(), y_pred.view(), mask.view(), Some(false), 0.975).unwrap();
        let all = residual(y.view(), y_pred.view(), mask.view(), None, 0.975).unwrap();

        for c in 0..3 {
            assert!((flare[c] - 1.0).abs() < 1e-6);
            assert!((quiet[c] - 3.0).abs() < 1e-6);
            let expected = (25.0 * 1.0 + 975.0 * 3.0) / 1000.0;
            assert!((all[c] - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn overall_mean_matches_manual_computation() {
        let y = array![[1.0, 2.0, 4.0], [2.0, -4.0, 5.0], [4.0, 8.0, 10.0]];
        let y_pred = array![[1.5, 2.0, 3.0], [2.0, -2.0, 5.0], [3.0, 8.0, 0.0]];
        let mask = array![
            [false, false, false],
            [false, true, false],
            [false, false, true]
        ];

        let got = residual(y.view(), y_pred.view(), mask.view(), None, 0.975).unwrap();

        assert!((got[0] - (50.0 + 0.0 + 25.0) / 3.0).abs() < TOL);
        assert!((got[1] - (0.0 + 0.0) / 2.0).abs() < TOL);
        assert!((got[2] - (25.0 + 0.0) / 2.0).abs() < TOL);
    }

    #[test]
    fn masked_outliers_never_change_the_means() {
        let (y, y_pred) = synthetic();
        let mut mask = Array2::from_elem(y.dim(), false);
        for i in (0..1000).step_by(37) {
            mask[[i, i % 3]] = true;
        }

        let mut noisy = y_pred.clone();
        Zip::from(&mut noisy).and(&mask).for_each(|p, &m| {
            if m {
                *p = 1e12;
            }
        });

        for flare in [None, Some(true), Some(false)] {
            let clean = residual(y.view(), y_pred.view(), mask.view(), flare, 0.975).unwrap();
            let dirty = residual(y.view(), noisy.view(), mask.view(), flare, 0.975).unwrap();
            assert_eq!(clean, dirty);
        }
    }

    #[test]
    fn fully_masked_channel_is_nan() {
        let y = array![[1.0, 1.0], [2.0, 2.0]];
        let mask = array![[false, true], [false, true]];
        let got = residual(y.view(), y.view(), mask.view(), None, 0.975).unwrap();
        assert_eq!(got[0], 0.0);
        assert!(got[1].is_nan());
    }

    #[test]
    fn flare_split_needs_the_reference_channel() {
        let y = Array2::<f64>::ones((4, 2));
        let mask = Array2::from_elem((4, 2), false);
        let err = residual(y.view(), y.view(), mask.view(), Some(true), 0.975).unwrap_err();
        assert!(matches!(err, IrradianceErr::ShapeMismatch { got: 2, expected: 3, .. }));
    }

    #[test]
    fn relative_error_skips_negative_truth() {
        let truth = array![[2.0, -1.0], [4.0, 5.0]];
        let pred = array![[3.0, 100.0], [3.0, 5.0]];

        let got = relative_error(truth.view(), pred.view()).unwrap();
        assert!((got[0] - (0.5 + 0.25) / 2.0).abs() < TOL);
        assert!((got[1] - 0.0).abs() < TOL);
        assert_eq!(
            negative_mask(truth.view()),
            array![[false, true], [false, false]]
        );
    }

    #[test]
    fn mismatched_prediction_is_rejected() {
        let y = Array2::<f64>::ones((4, 3));
        let p = Array2::<f64>::ones((5, 3));
        let mask = Array2::from_elem((4, 3), false);
        assert!(residual(y.view(), p.view(), mask.view(), None, 0.975).is_err());
        assert!(relative_error(y.view(), p.view()).is_err());
    }
}
