use std::{error::Error, fmt, io};

use irradiance::IrradianceErr;
use machine_learning::MlErr;

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Failures while processing a configuration.
#[derive(Debug)]
pub enum WorkerErr {
    Io(io::Error),
    Data(IrradianceErr),
    Model(MlErr),
    ShapeMismatch {
        what: &'static str,
        got: (usize, usize),
        expected: (usize, usize),
    },
    MissingTruth,
    NoChannels,
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::Io(e) => write!(f, "io error: {e}"),
            WorkerErr::Data(e) => write!(f, "data error: {e}"),
            WorkerErr::Model(e) => write!(f, "model error: {e}"),
            WorkerErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(f, "shape mismatch for {what}: got {got:?}, expected {expected:?}"),
            WorkerErr::MissingTruth => write!(f, "no ground truth to score against"),
            WorkerErr::NoChannels => write!(f, "there are no channels to score"),
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Io(e) => Some(e),
            WorkerErr::Data(e) => Some(e),
            WorkerErr::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WorkerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<IrradianceErr> for WorkerErr {
    fn from(value: IrradianceErr) -> Self {
        Self::Data(value)
    }
}

impl From<MlErr> for WorkerErr {
    fn from(value: MlErr) -> Self {
        Self::Model(value)
    }
}
