//! Error types shared by the CPU, EGL and Vulkan bindings
//!
//! Three outcomes matter to callers:
//! - `Unsupported`: the capability is missing. Callers get an empty result.
//! - `Acquisition`: a session could not be opened. Callers get no result.
//! - `Boundary`: handing a record to the consumer failed. This is fatal.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while probing hardware
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("{0} is not supported on this device")]
    Unsupported(String),

    #[error("Failed to acquire {what}: {reason}")]
    Acquisition { what: &'static str, reason: String },

    #[error("Boundary fault while delivering {record} records: {source}")]
    Boundary {
        record: &'static str,
        #[source]
        source: SinkError,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ProbeError {
    pub fn acquisition(what: &'static str, reason: impl ToString) -> Self {
        ProbeError::Acquisition {
            what,
            reason: reason.to_string(),
        }
    }

    /// True when the error should end the whole run rather than one query.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProbeError::Boundary { .. })
    }
}

/// Failure of a [`RecordSink`](crate::sink::RecordSink) to accept a record
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("write failed: {0}")]
    Io(#[from] io::Error),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_boundary_faults_are_fatal() {
        assert!(!ProbeError::Unsupported("Vulkan".into()).is_fatal());
        assert!(!ProbeError::acquisition("EGL display", "no display").is_fatal());

        let boundary = ProbeError::Boundary {
            record: "cache",
            source: SinkError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "closed")),
        };
        assert!(boundary.is_fatal());
        assert!(boundary.to_string().contains("cache"));
    }
}
