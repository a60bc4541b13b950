use std::fmt::{self, Display};

/// Errors produced by model constructors and parsers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    InvalidVisibility(i32),
    UnknownVisibility(String),
    InvalidId(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidVisibility(value) => {
                write!(f, "invalid visibility value: {value}")
            }
            ModelError::UnknownVisibility(raw) => {
                write!(f, "unknown visibility '{raw}', expected public or private")
            }
            ModelError::InvalidId(raw) => write!(f, "invalid image id: {raw}"),
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
