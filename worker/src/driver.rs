//! Runs every experiment configuration of a source directory, one after the other.

use std::{fmt, fs, num::NonZeroUsize, path::PathBuf, time::Instant};

use irradiance::{
    LinearBaseline, RunConfig, SummaryStats, archive, baseline,
    channels::ChannelNames,
    data::{DataLoader, InferenceDataset, NpyDataset},
};
use log::{debug, error, info, warn};
use machine_learning::{Model, checkpoint};
use ndarray::{Array2, ArrayView2, s};

use crate::{
    Claim, ClaimStore, DirClaimStore, DriverConfig, Mode, Result, WorkerErr,
    layout::{self, JobPaths},
    metrics::JobMetrics,
    report::Scorecard,
};

/// Why a configuration was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ModelMissing,
    TargetExists,
    Claimed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::ModelMissing => "model missing",
            SkipReason::TargetExists => "prediction already exists",
            SkipReason::Claimed => "claimed by another worker",
        };
        f.write_str(reason)
    }
}

/// What a completed configuration produced.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub prediction: PathBuf,
    pub rows: usize,
    pub channels: usize,
    /// The combined prediction's summary, when it was scored.
    pub score: Option<SummaryStats>,
    pub metrics: JobMetrics,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Completed(JobReport),
    Skipped(SkipReason),
}

/// How every configuration of a run ended.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub completed: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
    pub failed: Vec<String>,
}

impl RunSummary {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn log(&self) {
        info!(
            "run finished: completed={} skipped={} failed={}",
            self.completed.len(),
            self.skipped.len(),
            self.failed.len()
        );

        if !self.failed.is_empty() {
            warn!("failed configurations: {}", self.failed.join(", "));
        }
    }
}

/// What every configuration of a run shares, read the first time a job needs it.
struct Shared {
    baseline: Array2<f64>,
    dataset: NpyDataset,
    names: ChannelNames,
}

impl Shared {
    fn load(cfg: &DriverConfig) -> Result<Self> {
        let root = cfg.data_root();

        let model = LinearBaseline::load(root.join(baseline::MODEL_FILE))?;
        let key = cfg.mode().features_key(cfg.phase());
        let feats = baseline::load_features(root.join(baseline::FEATURES_FILE), &key)?;
        let baseline = model.predict(feats.view())?;

        let dataset = NpyDataset::open(root, cfg.phase(), cfg.mode().scores())?;

        let expected = (dataset.len(), dataset.channels());
        if baseline.dim() != expected {
            return Err(WorkerErr::ShapeMismatch {
                what: "baseline prediction",
                got: baseline.dim(),
                expected,
            });
        }

        let names = match cfg.mode() {
            Mode::Test { eve_root } => ChannelNames::load(eve_root),
            Mode::Inference => ChannelNames::default(),
        };

        Ok(Self {
            baseline,
            dataset,
            names,
        })
    }

    fn get<'a>(slot: &'a mut Option<Self>, cfg: &DriverConfig) -> Result<&'a Self> {
        let shared = match slot.take() {
            Some(shared) => shared,
            None => Self::load(cfg)?,
        };
        Ok(slot.insert(shared))
    }
}

/// Predicts, and optionally scores, every configuration not yet done by another worker.
pub struct Driver<S: ClaimStore = DirClaimStore> {
    cfg: DriverConfig,
    claims: S,
    shared: Option<Shared>,
}

impl Driver {
    pub fn new(cfg: DriverConfig) -> Self {
        Self::with_store(cfg, DirClaimStore)
    }
}

impl<S: ClaimStore> Driver<S> {
    /// Creates a new `Driver` claiming its jobs in `claims`.
    pub fn with_store(cfg: DriverConfig, claims: S) -> Self {
        Self {
            cfg,
            claims,
            shared: None,
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.cfg
    }

    pub fn claims(&self) -> &S {
        &self.claims
    }

    /// Runs every configuration found in the source directory, in name order.
    ///
    /// A failing configuration is logged and counted, the rest are still attempted.
    ///
    /// # Returns
    /// The run's summary or an io error if the source or target directory can't be used.
    pub fn run(&mut self) -> Result<RunSummary> {
        fs::create_dir_all(self.cfg.target())?;

        let names = layout::discover(self.cfg.src())?;
        info!("found {} configuration(s) in {}", names.len(), self.cfg.src().display());

        let mut summary = RunSummary::default();
        for name in names {
            match self.run_job(&name) {
                Ok(Outcome::Completed(report)) => {
                    info!(
                        "{name}: wrote {} ({}x{}) batches={} load={:?} infer={:?}",
                        report.prediction.display(),
                        report.rows,
                        report.channels,
                        report.metrics.batches,
                        report.metrics.load_time,
                        report.metrics.infer_time
                    );
                    summary.completed.push(name);
                }
                Ok(Outcome::Skipped(reason)) => {
                    debug!("{name}: skipped, {reason}");
                    summary.skipped.push((name, reason));
                }
                Err(e) => {
                    error!("{name}: {e}");
                    summary.failed.push(name);
                }
            }
        }

        Ok(summary)
    }

    /// Runs a single configuration from its JSON file to its persisted prediction.
    ///
    /// # Arguments
    /// * `name` - The configuration's name, its file stem.
    ///
    /// # Returns
    /// Whether the job was done or skipped, or the error that stopped it.
    pub fn run_job(&mut self, name: &str) -> Result<Outcome> {
        let paths = JobPaths::new(&self.cfg, name);

        let run_cfg = RunConfig::load(&paths.config)?;
        info!("{name}: {run_cfg}");

        fs::create_dir_all(&paths.target_base)?;

        debug!("{name}: model at {}", paths.model.display());
        if !paths.model.is_file() {
            return Ok(Outcome::Skipped(SkipReason::ModelMissing));
        }

        if paths.prediction.exists() {
            return Ok(Outcome::Skipped(SkipReason::TargetExists));
        }

        if let Some(max_age) = self.cfg.orphan_age() {
            if self.claims.clear_orphan(&paths.lock, max_age) {
                warn!("{name}: cleared claim older than {max_age:?}");
            }
        }

        let Some(claim) = Claim::acquire(&self.claims, paths.lock.clone(), self.cfg.release())
        else {
            return Ok(Outcome::Skipped(SkipReason::Claimed));
        };

        let mut metrics = JobMetrics::default();

        let start = Instant::now();
        let model = checkpoint::load(&paths.model)?;
        let shared = Shared::get(&mut self.shared, &self.cfg)?;
        metrics.load_time = start.elapsed();

        let dataset = &shared.dataset;

        let start = Instant::now();
        let outputs = infer(
            &model,
            dataset.inputs(),
            self.cfg.batch_size(),
            self.cfg.log_every(),
            &mut metrics,
        )?;
        metrics.infer_time = start.elapsed();

        let residual = run_cfg.unscale_outputs(
            outputs.mapv(f64::from),
            dataset.eve_means(),
            dataset.eve_stds(),
        )?;

        if residual.dim() != shared.baseline.dim() {
            return Err(WorkerErr::ShapeMismatch {
                what: "residual prediction",
                got: residual.dim(),
                expected: shared.baseline.dim(),
            });
        }

        let combined = &shared.baseline + &residual;

        let score = match self.cfg.mode() {
            Mode::Test { .. } => {
                let start = Instant::now();
                let truth = dataset.eve().ok_or(WorkerErr::MissingTruth)?;
                let card = Scorecard::new(truth, shared.baseline.view(), combined.view())?;

                card.print(&shared.names);
                card.write_report(&paths.report)?;
                metrics.score_time = start.elapsed();

                Some(card.combined.summary)
            }
            Mode::Inference => None,
        };

        archive::write_matrix(&paths.prediction, &combined)?;
        claim.complete()?;

        Ok(Outcome::Completed(JobReport {
            prediction: paths.prediction,
            rows: combined.nrows(),
            channels: combined.ncols(),
            score,
            metrics,
        }))
    }
}

/// Runs `model` over `inputs` in order, one batch at a time.
///
/// # Arguments
/// * `model` - The residual network.
/// * `inputs` - Every input row.
/// * `batch_size` - Rows per forward pass.
/// * `log_every` - Batches between two progress lines.
/// * `metrics` - Where batch and sample counts are added.
///
/// # Returns
/// One output row per input row.
pub fn infer<M: Model + ?Sized>(
    model: &M,
    inputs: ArrayView2<f32>,
    batch_size: NonZeroUsize,
    log_every: usize,
    metrics: &mut JobMetrics,
) -> Result<Array2<f32>> {
    let loader = DataLoader::new(inputs, batch_size);
    let total = loader.num_batches();

    let width = model.output_size();
    let mut outputs = Array2::zeros((inputs.nrows(), width));
    let mut row = 0;

    for (i, batch) in loader.enumerate() {
        if i % log_every.max(1) == 0 {
            info!("{i:06}/{total:06}");
        }

        let n = batch.nrows();
        let out = model.forward(batch)?;

        if out.dim() != (n, width) {
            return Err(WorkerErr::ShapeMismatch {
                what: "model output",
                got: out.dim(),
                expected: (n, width),
            });
        }

        outputs.slice_mut(s![row..row + n, ..]).assign(&out);
        row += n;

        metrics.bump_batch();
        metrics.add_samples(n);
    }

    Ok(outputs)
}
