//! Top-level error type mapped to process exit codes

use devtail_device::DeviceError;
use devtail_logs::{FilterError, StreamError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("the `{filter}` filter is only available on Android")]
    UnsupportedFilter { filter: &'static str },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::UnsupportedFilter { .. } | CliError::Filter(_) => 2,
            CliError::Device(_) => 3,
            CliError::Stream(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_errors_exit_with_two() {
        let err = CliError::UnsupportedFilter { filter: "app" };
        assert_eq!(err.exit_code(), 2);

        let err = CliError::Filter(FilterError::InvalidPattern {
            pattern: "tag:".into(),
            reason: "missing priority".into(),
        });
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_stream_errors_exit_with_one() {
        let err = CliError::Stream(StreamError::SourceFatal("No devices are booted.".into()));
        assert_eq!(err.exit_code(), 1);
    }
}
