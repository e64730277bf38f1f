use std::{error::Error, fmt, io, path::PathBuf};

use ndarray_npy::{ReadNpyError, ReadNpzError, WriteNpyError};

/// The irradiance module's result type.
pub type Result<T> = std::result::Result<T, IrradianceErr>;

/// Failures while reading inputs or combining predictions.
#[derive(Debug)]
pub enum IrradianceErr {
    Io(io::Error),
    Json(serde_json::Error),
    ReadNpy(ReadNpyError),
    ReadNpz(ReadNpzError),
    WriteNpy(WriteNpyError),
    MissingKey {
        archive: PathBuf,
        key: String,
    },
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    InvalidShape {
        what: String,
        got: Vec<usize>,
    },
}

impl fmt::Display for IrradianceErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrradianceErr::Io(e) => write!(f, "io error: {e}"),
            IrradianceErr::Json(e) => write!(f, "invalid config: {e}"),
            IrradianceErr::ReadNpy(e) => write!(f, "cannot read npy: {e}"),
            IrradianceErr::ReadNpz(e) => write!(f, "cannot read npz: {e}"),
            IrradianceErr::WriteNpy(e) => write!(f, "cannot write npy: {e}"),
            IrradianceErr::MissingKey { archive, key } => {
                write!(f, "{} has no array named {key}", archive.display())
            }
            IrradianceErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(f, "shape mismatch for {what}: got {got}, expected {expected}"),
            IrradianceErr::InvalidShape { what, got } => {
                write!(f, "{what} has an invalid shape {got:?}")
            }
        }
    }
}

impl Error for IrradianceErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            IrradianceErr::Io(e) => Some(e),
            IrradianceErr::Json(e) => Some(e),
            IrradianceErr::ReadNpy(e) => Some(e),
            IrradianceErr::ReadNpz(e) => Some(e),
            IrradianceErr::WriteNpy(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for IrradianceErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for IrradianceErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<ReadNpyError> for IrradianceErr {
    fn from(value: ReadNpyError) -> Self {
        Self::ReadNpy(value)
    }
}

impl From<ReadNpzError> for IrradianceErr {
    fn from(value: ReadNpzError) -> Self {
        Self::ReadNpz(value)
    }
}

impl From<WriteNpyError> for IrradianceErr {
    fn from(value: WriteNpyError) -> Self {
        Self::WriteNpy(value)
    }
}
