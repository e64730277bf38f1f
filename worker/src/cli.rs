//! Command line shared by the two binaries.

use std::{num::NonZeroUsize, path::PathBuf, time::Duration};

use anyhow::bail;
use clap::Args;
use irradiance::Phase;

use crate::{
    Driver, DriverConfig, Mode, ReleasePolicy,
    config::{DEFAULT_BATCH_SIZE, DEFAULT_LOG_EVERY},
};

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Directory holding the `*.json` experiment configurations
    #[arg(long)]
    pub src: PathBuf,

    /// Directory holding `<name>/<name>_model.safetensors` for every configuration
    #[arg(long)]
    pub models: PathBuf,

    /// Directory where `<name>/<name>.npy` predictions are written
    #[arg(long)]
    pub target: PathBuf,

    /// Directory holding the baseline model, its features and the dataset
    #[arg(long = "data_root")]
    pub data_root: PathBuf,

    /// Dataset split to predict (train, val or test)
    #[arg(long, default_value_t = Phase::Test)]
    pub phase: Phase,

    /// Rows per forward pass
    #[arg(long = "batch_size", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: NonZeroUsize,

    /// Batches between two progress lines
    #[arg(long = "log_every", default_value_t = DEFAULT_LOG_EVERY)]
    pub log_every: NonZeroUsize,

    /// Leave the claim of a failed configuration in place instead of releasing it
    #[arg(long = "keep_failed_claims")]
    pub keep_failed_claims: bool,

    /// Clear claims older than this many seconds before trying to claim
    #[arg(long = "orphan_age")]
    pub orphan_age: Option<u64>,
}

impl CommonArgs {
    pub fn into_config(self, mode: Mode) -> DriverConfig {
        let release = if self.keep_failed_claims {
            ReleasePolicy::OnSuccess
        } else {
            ReleasePolicy::Always
        };

        DriverConfig::new(
            self.src,
            self.models,
            self.target,
            self.data_root,
            self.phase,
            mode,
        )
        .with_batch_size(self.batch_size)
        .with_log_every(self.log_every)
        .with_release(release)
        .with_orphan_age(self.orphan_age.map(Duration::from_secs))
    }
}

/// Predicts the residual of every configuration and adds the linear baseline.
#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct InferArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

impl InferArgs {
    pub fn into_config(self) -> DriverConfig {
        self.common.into_config(Mode::Inference)
    }
}

/// Predicts like `residual-infer`, then scores every configuration against the ground truth.
#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct TestArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Directory holding the EVE line names as `name.txt`, one per line (export `name.npy` to it)
    #[arg(long = "eve_root")]
    pub eve_root: PathBuf,
}

impl TestArgs {
    pub fn into_config(self) -> DriverConfig {
        let mode = Mode::Test {
            eve_root: self.eve_root,
        };
        self.common.into_config(mode)
    }
}

/// Logs at `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Runs every configuration and fails if any of them did.
pub fn run(cfg: DriverConfig) -> anyhow::Result<()> {
    let summary = Driver::new(cfg).run()?;
    summary.log();

    if summary.failed_count() > 0 {
        bail!("{} configuration(s) failed", summary.failed_count());
    }

    Ok(())
}
