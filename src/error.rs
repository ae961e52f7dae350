use std::io;

use thiserror::Error;

use crate::a_funcs::Activation;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AllocationFailure,
    MalformedFile,
    InvalidTopology,
    DimensionMismatch,
    Overflow,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Could not (de)serialize network: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed file: {0}")]
    MalformedFile(String),

    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    #[error("Activation function {0:?} cannot be used for training")]
    Untrainable(Activation),

    #[error("Dimension mismatch: expected {expected} values but received {received}")]
    DimensionMismatch { expected: usize, received: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Value {value} does not fit the fixed point range with decimal point {decimal_point}")]
    Overflow { value: f32, decimal_point: u32 },
}

impl Error {
    pub(crate) fn dims(expected: usize, received: usize) -> Self {
        Error::DimensionMismatch { expected, received }
    }

    pub(crate) fn topology<S: Into<String>>(msg: S) -> Self {
        Error::InvalidTopology(msg.into())
    }

    pub(crate) fn malformed<S: Into<String>>(msg: S) -> Self {
        Error::MalformedFile(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(e) if e.kind() == io::ErrorKind::OutOfMemory => ErrorKind::AllocationFailure,
            Error::Io(_) | Error::Json(_) | Error::MalformedFile(_) => ErrorKind::MalformedFile,
            Error::InvalidTopology(_) | Error::Untrainable(_) | Error::InvalidParameter(_) => {
                ErrorKind::InvalidTopology
            }
            Error::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Error::Overflow { .. } => ErrorKind::Overflow,
        }
    }
}
