//! Error taxonomy shared by every benchmark.
use std::fmt;

#[derive(Debug)]
pub enum BenchError {
    /// Out-of-range or structurally invalid parameters
    Configuration(String),
    /// Checksum diverged between trials of the same configuration
    Consistency {
        expected: u64,
        observed: u64,
        trial: u64,
    },
    /// Backing memory for the working set couldn't be allocated
    Resource(String),
    /// Batch file couldn't be opened/read, or a row couldn't be written
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchError::Configuration(msg) => write!(f, "invalid configuration: {msg}"),
            BenchError::Consistency {
                expected,
                observed,
                trial,
            } => write!(
                f,
                "loopSum mismatch on trial {trial}: expected {expected}, observed {observed}"
            ),
            BenchError::Resource(msg) => write!(f, "allocation failed: {msg}"),
            BenchError::Io { context, source } => write!(f, "{context}: {source}"),
        }
    }
}

impl std::error::Error for BenchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BenchError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::collections::TryReserveError> for BenchError {
    fn from(err: std::collections::TryReserveError) -> Self {
        BenchError::Resource(err.to_string())
    }
}
