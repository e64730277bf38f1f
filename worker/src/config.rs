use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};

use irradiance::Phase;

/// Rows fed to the model per forward pass.
pub const DEFAULT_BATCH_SIZE: NonZeroUsize = NonZeroUsize::new(64).unwrap();

/// Batches between two progress lines.
pub const DEFAULT_LOG_EVERY: NonZeroUsize = NonZeroUsize::new(20).unwrap();

/// What a run does with its predictions besides persisting them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Only predict.
    Inference,
    /// Predict, then score against the ground truth and write a report.
    Test { eve_root: PathBuf },
}

impl Mode {
    /// The key of the baseline feature matrix in the features archive.
    pub fn features_key(&self, phase: Phase) -> String {
        match self {
            Mode::Inference => "X".to_string(),
            Mode::Test { .. } => format!("X{}", phase.abbrev()),
        }
    }

    pub fn scores(&self) -> bool {
        matches!(self, Mode::Test { .. })
    }
}

/// When a held claim is given back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleasePolicy {
    /// On every exit path, so a failed job can be retried by the next run.
    #[default]
    Always,
    /// Only once the prediction was persisted. A failed job stays claimed until the marker is
    /// removed by hand or is older than the orphan age.
    OnSuccess,
}

/// Immutable settings for a driver run.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    src: PathBuf,
    models: PathBuf,
    target: PathBuf,
    data_root: PathBuf,
    phase: Phase,
    mode: Mode,
    batch_size: NonZeroUsize,
    log_every: NonZeroUsize,
    release: ReleasePolicy,
    orphan_age: Option<Duration>,
}

impl DriverConfig {
    /// Creates a new driver configuration with the default batching and claim settings.
    ///
    /// # Args
    /// * `src` - Directory holding the `*.json` experiment configurations.
    /// * `models` - Directory holding one model directory per configuration.
    /// * `target` - Directory where predictions are written.
    /// * `data_root` - Directory holding the baseline and the dataset.
    /// * `phase` - The dataset split to predict.
    /// * `mode` - Whether to score the predictions.
    ///
    /// # Returns
    /// A `DriverConfig` instance.
    pub fn new<P: Into<PathBuf>>(
        src: P,
        models: P,
        target: P,
        data_root: P,
        phase: Phase,
        mode: Mode,
    ) -> Self {
        Self {
            src: src.into(),
            models: models.into(),
            target: target.into(),
            data_root: data_root.into(),
            phase,
            mode,
            batch_size: DEFAULT_BATCH_SIZE,
            log_every: DEFAULT_LOG_EVERY,
            release: ReleasePolicy::default(),
            orphan_age: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: NonZeroUsize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_log_every(mut self, log_every: NonZeroUsize) -> Self {
        self.log_every = log_every;
        self
    }

    pub fn with_release(mut self, release: ReleasePolicy) -> Self {
        self.release = release;
        self
    }

    /// Markers older than `orphan_age` are cleared before claiming.
    pub fn with_orphan_age(mut self, orphan_age: Option<Duration>) -> Self {
        self.orphan_age = orphan_age;
        self
    }

    pub fn src(&self) -> &Path {
        &self.src
    }

    pub fn models(&self) -> &Path {
        &self.models
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn batch_size(&self) -> NonZeroUsize {
        self.batch_size
    }

    pub fn log_every(&self) -> usize {
        self.log_every.get()
    }

    pub fn release(&self) -> ReleasePolicy {
        self.release
    }

    pub fn orphan_age(&self) -> Option<Duration> {
        self.orphan_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_key_depends_on_mode() {
        let test = Mode::Test {
            eve_root: PathBuf::from("eve"),
        };

        assert_eq!(Mode::Inference.features_key(Phase::Val), "X");
        assert_eq!(test.features_key(Phase::Train), "XTr");
        assert_eq!(test.features_key(Phase::Val), "XVa");
        assert_eq!(test.features_key(Phase::Test), "XTe");
        assert!(test.scores());
        assert!(!Mode::Inference.scores());
    }

    #[test]
    fn defaults() {
        let cfg = DriverConfig::new("src", "models", "out", "data", Phase::Test, Mode::Inference);

        assert_eq!(cfg.batch_size().get(), 64);
        assert_eq!(cfg.log_every(), 20);
        assert_eq!(cfg.release(), ReleasePolicy::Always);
        assert_eq!(cfg.orphan_age(), None);
    }
}
