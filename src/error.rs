use thiserror::Error;

/// Errors raised while building a PE, a grid or a stimulus.
///
/// Arithmetic overflow and handshake violations are never errors: they are
/// absorbed by saturation and by the ready/valid flags.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeError {
    #[error("invalid {name}: {value} ({reason})")]
    InvalidWidth {
        name: &'static str,
        value: u32,
        reason: &'static str,
    },
    #[error("{name} must be at least 1")]
    ZeroDepth { name: &'static str },
    #[error("grid must have at least one row and one column, got {rows}x{cols}")]
    EmptyGrid { rows: usize, cols: usize },
    #[error("stimulus mismatch: {0}")]
    Stimulus(String),
}
