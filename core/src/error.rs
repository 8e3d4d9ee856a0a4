//! Error types for yload-core

use thiserror::Error;

use crate::config::ConfigError;

/// Core error type
#[derive(Error, Debug)]
pub enum GenError {
    /// One or more parameters failed validation
    #[error("invalid parameters: {}", join_errors(.0))]
    InvalidParams(Vec<ConfigError>),

    /// The ticket pool could not be created
    #[error("ticket pool initialization failed (capacity {0})")]
    Tickets(u32),

    /// The ticket pool was closed while a ticket was being taken
    #[error("ticket pool closed")]
    PoolClosed,
}

impl GenError {
    /// The individual validation failures, if this is a parameter error
    pub fn config_errors(&self) -> &[ConfigError] {
        match self {
            GenError::InvalidParams(errors) => errors,
            _ => &[],
        }
    }
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias
pub type GenResult<T> = std::result::Result<T, GenError>;
