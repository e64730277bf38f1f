use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use safetensors::SafeTensorError;

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        a: &'static str,
        b: &'static str,
        got: usize,
        expected: usize,
    },
    EmptyModel,
    MissingTensor {
        name: String,
    },
    InvalidDtype {
        name: String,
        got: String,
    },
    InvalidShape {
        name: String,
        got: Vec<usize>,
    },
    InvalidActivation {
        layer: usize,
        value: String,
    },
    SafeTensors(SafeTensorError),
    Io(io::Error),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                a,
                b,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch between {a} and {b}, got {got} and expected {expected}"
            ),
            MlErr::EmptyModel => write!(f, "The model must have at least one layer"),
            MlErr::MissingTensor { name } => {
                write!(f, "The checkpoint has no tensor named {name}")
            }
            MlErr::InvalidDtype { name, got } => {
                write!(f, "Tensor {name} has dtype {got}, expected F32")
            }
            MlErr::InvalidShape { name, got } => {
                write!(f, "Tensor {name} has an invalid shape {got:?}")
            }
            MlErr::InvalidActivation { layer, value } => {
                write!(f, "Layer {layer} has an unknown activation '{value}'")
            }
            MlErr::SafeTensors(e) => write!(f, "safetensors error: {e}"),
            MlErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::SafeTensors(e) => Some(e),
            MlErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MlErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<SafeTensorError> for MlErr {
    fn from(value: SafeTensorError) -> Self {
        Self::SafeTensors(value)
    }
}
