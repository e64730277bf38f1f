pub mod claim;
pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod layout;
pub mod metrics;
pub mod report;

pub use claim::{Claim, ClaimStore, DirClaimStore};
pub use config::{DriverConfig, Mode, ReleasePolicy};
pub use driver::{Driver, Outcome, RunSummary, SkipReason};
pub use error::{Result, WorkerErr};
