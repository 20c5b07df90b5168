use std::fmt;

/// Errors that fail a whole computation. Anything recoverable, such as an
/// unresolvable source reference or a group with no keys, is skipped inside
/// the engine and counted in the run summary instead of surfacing here.
#[derive(Debug)]
pub enum MatrixError {
    /// The request document is not valid TOML for the config schema.
    Syntax(String),
    /// The request parsed cleanly but cannot be computed as written
    /// (no input files, a filter with nothing to match against, ...).
    Invalid(String),
}

impl fmt::Display for MatrixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(reason) => write!(f, "config syntax error: {reason}"),
            Self::Invalid(reason) => write!(f, "config rejected: {reason}"),
        }
    }
}

impl std::error::Error for MatrixError {}
