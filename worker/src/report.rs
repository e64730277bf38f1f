//! Scoring of a configuration's predictions against the ground truth.

use std::{fmt::Write as _, fs, path::Path};

use irradiance::{
    SummaryStats,
    channels::ChannelNames,
    resid::{self, DEFAULT_FLARE_PCT},
};
use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::{Result, WorkerErr};

/// Per-channel percent errors over every row and split by flare activity.
#[derive(Debug, Clone)]
pub struct FlareAnalysis {
    pub overall: Array1<f64>,
    pub flare: Array1<f64>,
    pub quiet: Array1<f64>,
}

impl FlareAnalysis {
    /// Analyzes `pred` against `truth`, leaving out negative truth values.
    pub fn new(truth: ArrayView2<f64>, pred: ArrayView2<f64>) -> Result<Self> {
        let mask = resid::negative_mask(truth);
        let split = |flare| resid::residual(truth, pred, mask.view(), flare, DEFAULT_FLARE_PCT);

        Ok(Self {
            overall: split(None)?,
            flare: split(Some(true))?,
            quiet: split(Some(false))?,
        })
    }

    pub fn print(&self, names: &ChannelNames) {
        println!("Overall");
        println!("{}", names.format_errors(self.overall.view()));
        println!("Flare");
        println!("{}", names.format_errors(self.flare.view()));
        println!("Non-Flare");
        println!("{}", names.format_errors(self.quiet.view()));
    }
}

/// The scores of one predictor.
#[derive(Debug, Clone)]
pub struct Score {
    /// Mean relative error per channel, as a fraction.
    pub errors: Array1<f64>,
    pub summary: SummaryStats,
    pub analysis: FlareAnalysis,
}

impl Score {
    fn new(truth: ArrayView2<f64>, pred: ArrayView2<f64>) -> Result<Self> {
        let errors = resid::relative_error(truth, pred)?;
        let summary = SummaryStats::of(errors.view()).ok_or(WorkerErr::NoChannels)?;
        let analysis = FlareAnalysis::new(truth, pred)?;

        Ok(Self {
            errors,
            summary,
            analysis,
        })
    }

    fn print(&self, names: &ChannelNames) {
        println!("{}", self.summary);
        println!("{:.4}", self.errors);
        self.analysis.print(names);
    }
}

/// How the baseline alone and the baseline plus the residual model compare to the truth.
#[derive(Debug, Clone)]
pub struct Scorecard {
    pub baseline: Score,
    pub combined: Score,
}

impl Scorecard {
    /// Scores both predictors.
    ///
    /// # Arguments
    /// * `truth` - The ground truth in physical units.
    /// * `baseline` - The linear baseline's prediction.
    /// * `combined` - The baseline plus the unscaled residual prediction.
    ///
    /// # Returns
    /// The scorecard or an error if the shapes disagree.
    pub fn new(
        truth: ArrayView2<f64>,
        baseline: ArrayView2<f64>,
        combined: ArrayView2<f64>,
    ) -> Result<Self> {
        Ok(Self {
            baseline: Score::new(truth, baseline)?,
            combined: Score::new(truth, combined)?,
        })
    }

    /// Writes both scores to stdout.
    pub fn print(&self, names: &ChannelNames) {
        println!("Initial");
        self.baseline.print(names);
        self.combined.print(names);
    }

    /// Writes the combined score to `path`.
    pub fn write_report<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let text = format_report(&self.combined.summary, self.combined.errors.view());
        fs::write(path, text)?;
        Ok(())
    }
}

/// The summary line, then every channel's error followed by a space.
pub fn format_report(summary: &SummaryStats, errors: ArrayView1<f64>) -> String {
    let mut text = format!("{summary}\n");
    for e in errors {
        let _ = write!(text, "{e:.4} ");
    }
    text
}
