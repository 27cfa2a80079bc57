use std::{error::Error, fmt};

/// The distributed module's result type.
pub type Result<T> = std::result::Result<T, DistributedError>;

/// Failures of collective operations and process-group management.
#[derive(Debug)]
pub enum DistributedError {
    /// A collective operation could not complete.
    Collective { op: &'static str, msg: String },
    /// No default process group has been initialized.
    NotInitialized,
    /// An object could not be encoded or decoded for the wire.
    Serialization(serde_json::Error),
    /// The participants of a collective disagreed on a buffer length.
    ShapeMismatch {
        op: &'static str,
        got: usize,
        expected: usize,
    },
    /// The group member was already torn down.
    Closed,
}

impl DistributedError {
    pub(crate) fn collective(op: &'static str, msg: impl Into<String>) -> Self {
        Self::Collective {
            op,
            msg: msg.into(),
        }
    }
}

impl fmt::Display for DistributedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributedError::Collective { op, msg } => write!(f, "{op} failed: {msg}"),
            DistributedError::NotInitialized => {
                write!(f, "default process group is not initialized")
            }
            DistributedError::Serialization(e) => write!(f, "serialization error: {e}"),
            DistributedError::ShapeMismatch { op, got, expected } => {
                write!(f, "{op} length mismatch: got {got}, expected {expected}")
            }
            DistributedError::Closed => write!(f, "process group member is closed"),
        }
    }
}

impl Error for DistributedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DistributedError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DistributedError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}
