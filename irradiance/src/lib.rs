pub mod archive;
pub mod baseline;
pub mod channels;
pub mod config;
pub mod data;
pub mod error;
pub mod resid;
pub mod scaling;
pub mod stats;

pub use baseline::LinearBaseline;
pub use config::{EveTransform, Phase, RunConfig};
pub use error::{IrradianceErr, Result};
pub use stats::SummaryStats;
