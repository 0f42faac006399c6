//! Error types.

use thiserror::Error;

use crate::engine::MechanismResult;

/// Result alias for switcher operations.
pub type Result<T> = std::result::Result<T, SwitcherError>;

/// Errors returned by switcher operations.
///
/// A command that runs and exits non-zero is *not* an error: it is recorded
/// as a failed [`MechanismResult`] in the operation's outcome.
#[derive(Debug, Error)]
pub enum SwitcherError {
    /// Filesystem I/O failed (profile file access).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The profile file is not valid JSON or has the wrong shape.
    #[error("malformed profile file: {0}")]
    Json(#[from] serde_json::Error),

    /// The external command could not be started (missing executable, etc.).
    #[error("failed to launch `{program}`: {source}")]
    LaunchFailed {
        /// The program that was invoked.
        program: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// An apply/reset was requested with no target adapters.
    #[error("no adapters given")]
    EmptyAdapterSet,

    /// A mutating operation was attempted without administrator rights.
    #[error("administrator privileges are required to change DNS settings")]
    NotElevated,

    /// Every command the operation issued failed to launch.
    #[error("no configuration command could be launched ({} attempts)", .log.len())]
    MechanismsUnavailable {
        /// The failed attempts, in the order they were made.
        log: Vec<MechanismResult>,
    },

    /// A profile definition is unusable.
    #[error("invalid profile: {0}")]
    InvalidProfile(String),
}

impl SwitcherError {
    /// Returns `true` if an external command could not be started.
    #[must_use]
    pub const fn is_launch_failure(&self) -> bool {
        matches!(
            self,
            Self::LaunchFailed { .. } | Self::MechanismsUnavailable { .. }
        )
    }

    /// Returns `true` if the underlying I/O error is `PermissionDenied`.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Io(e) | Self::LaunchFailed { source: e, .. } => {
                e.kind() == std::io::ErrorKind::PermissionDenied
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_failure_predicate() {
        let err = SwitcherError::LaunchFailed {
            program: "netsh".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.is_launch_failure());
        assert!(!err.is_permission_denied());
        assert!(err.to_string().starts_with("failed to launch `netsh`"));

        assert!(!SwitcherError::EmptyAdapterSet.is_launch_failure());
    }

    #[test]
    fn permission_denied_predicate() {
        let err = SwitcherError::from(std::io::Error::from(
            std::io::ErrorKind::PermissionDenied,
        ));
        assert!(err.is_permission_denied());
    }
}
