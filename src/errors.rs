//! All errors that can occur in the segvolution library.

use std::fmt;

#[derive(Clone, Debug)]
pub enum EngineError {
    InvalidParameter(String),
    OutputError(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineError::InvalidParameter(message) => {
                write!(f, "InvalidParameter: {}", message)
            }
            EngineError::OutputError(message) => {
                write!(f, "OutputError: {}", message)
            }
        }
    }
}

impl std::error::Error for EngineError {}
