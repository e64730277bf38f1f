pub mod arch;
pub mod checkpoint;
pub mod error;

pub use arch::{Model, Sequential};
pub use error::{MlErr, Result};
