use std::io;
use std::path::PathBuf;

/// Errors surfaced by the setup side of the logger.
///
/// The submission path never returns these: a dropped or unwritten line is
/// reported on the error stream instead, so logging can't change the caller's
/// control flow.
#[derive(Debug, thiserror::Error)]
pub enum RingLogError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Logger already configured")]
    AlreadyConfigured,

    #[error("Logger not configured")]
    NotConfigured,

    #[error("Persistence worker already started")]
    WorkerAlreadyStarted,

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Short write to log file: wrote {written} of {expected} bytes")]
    PartialWrite { written: usize, expected: usize },

    #[error("Failed to spawn persistence worker: {0}")]
    WorkerSpawn(#[source] io::Error),
}

impl RingLogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        RingLogError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RingLogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = RingLogError::InvalidConfig("cell capacity is zero".to_string());
        assert_eq!(error.to_string(), "Invalid configuration: cell capacity is zero");

        let error = RingLogError::PartialWrite { written: 3, expected: 10 };
        assert_eq!(error.to_string(), "Short write to log file: wrote 3 of 10 bytes");
    }

    #[test]
    fn test_io_error_keeps_path_and_source() {
        let error = RingLogError::io(
            "/tmp/missing/app.log",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        let text = error.to_string();
        assert!(text.contains("/tmp/missing/app.log"));
        assert!(text.contains("no such file"));
        assert!(std::error::Error::source(&error).is_some());
    }
}
