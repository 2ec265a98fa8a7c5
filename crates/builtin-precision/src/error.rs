//! Error types
//!
//! Definition mistakes in the function catalogue (wrong arity, bad shapes) are programming
//! errors and panic. Only run-time conditions surface as these errors.

use thiserror::Error;

/// Errors that can occur while loading a suite configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_norway::Error),
    /// A float format is inconsistent (name, reason)
    #[error("Invalid float format '{0}': {1}")]
    InvalidFormat(String, String),
    #[error("Configuration selects no shader types")]
    NoShaderTypes,
}

/// Errors reported by a shader executor
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The generated shader failed to compile
    #[error("Shader compilation failed:\n{info_log}")]
    Compile { info_log: String },
    /// Input buffer does not hold `num_values` values (input index, expected words, actual words)
    #[error("Input {0} holds {2} words, expected {1}")]
    BufferSize(usize, usize, usize),
    #[error("The executor does not support {0} shaders")]
    UnsupportedStage(String),
    #[error("Device error: {0}")]
    Device(String),
    #[error("Failed to read back results: {0}")]
    Mapping(String),
}
