//! Error types shared across the runtime.

use std::io;
use thiserror::Error;

/// Misuse of the runtime by the calling program. Not recoverable by the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("configuration accessed before initialization")]
    Uninitialized,

    #[error("--{first} and --{second} are mutually exclusive")]
    MutuallyExclusive {
        first: &'static str,
        second: &'static str,
    },

    #[error("global configuration is already initialized")]
    AlreadyInitialized,
}

/// Why a connectivity probe did not succeed.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The socket failed. Expected when offline or firewalled, never reported.
    #[error("host unreachable: {0}")]
    Unreachable(#[from] io::Error),

    /// The probe could not be attempted at all.
    #[error("{0}")]
    Unexpected(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_errors_are_unreachable() {
        for kind in [
            io::ErrorKind::ConnectionRefused,
            io::ErrorKind::PermissionDenied,
            io::ErrorKind::InvalidInput,
            io::ErrorKind::Other,
        ] {
            let err: ProbeError = io::Error::from(kind).into();
            assert!(matches!(err, ProbeError::Unreachable(_)), "{kind:?}");
        }
    }

    #[test]
    fn test_mutually_exclusive_message() {
        let err = UsageError::MutuallyExclusive {
            first: "verbose",
            second: "quiet",
        };
        assert_eq!(err.to_string(), "--verbose and --quiet are mutually exclusive");
    }
}
