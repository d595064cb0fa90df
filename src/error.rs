use std::io;

/// All error types for gear mesh generation and export.
#[derive(thiserror::Error, Debug)]
pub enum GearError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Root finder did not converge at radius {radius}: residual {residual}")]
    NonConvergence { radius: f32, residual: f32 },
    #[error("Geometry construction failed: {0}")]
    Geometry(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Output error: {0}")]
    Output(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GearError>;
