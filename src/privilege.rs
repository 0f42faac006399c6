//! Privilege detection.

/// Whether the caller may change adapter DNS settings.
///
/// Passed into [`DnsEngine`](crate::DnsEngine) explicitly instead of being checked
/// mid-operation. Mutating operations with [`Privilege::Unelevated`] fail
/// with [`SwitcherError::NotElevated`](crate::SwitcherError::NotElevated)
/// before any command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// Running with administrator rights.
    Elevated,
    /// Running as a regular user.
    Unelevated,
}

impl Privilege {
    /// Reads the privilege level of the current process.
    ///
    /// On Windows this queries the process token for `TokenElevation`.
    /// On Unix, where no adapter commands exist, it reports root as elevated
    /// so the crate can be exercised in development and tests. Elsewhere it
    /// always reports [`Privilege::Unelevated`].
    #[must_use]
    pub fn detect() -> Self {
        #[cfg(windows)]
        {
            Self::from_flag(is_token_elevated())
        }

        #[cfg(unix)]
        {
            Self::from_flag(is_effective_root())
        }

        #[cfg(not(any(windows, unix)))]
        {
            Self::Unelevated
        }
    }

    /// Maps a boolean "is admin" flag.
    #[must_use]
    pub const fn from_flag(elevated: bool) -> Self {
        if elevated {
            Self::Elevated
        } else {
            Self::Unelevated
        }
    }

    /// Returns `true` for [`Privilege::Elevated`].
    #[must_use]
    pub const fn is_elevated(self) -> bool {
        matches!(self, Self::Elevated)
    }
}

/// Checks whether the current process token is elevated (UAC).
#[cfg(windows)]
#[must_use]
pub fn is_token_elevated() -> bool {
    use std::mem;
    use std::ptr;
    use winapi::shared::minwindef::DWORD;
    use winapi::um::handleapi::CloseHandle;
    use winapi::um::processthreadsapi::{GetCurrentProcess, OpenProcessToken};
    use winapi::um::securitybaseapi::GetTokenInformation;
    use winapi::um::winnt::{HANDLE, TOKEN_ELEVATION, TOKEN_QUERY, TokenElevation};

    let mut token: HANDLE = ptr::null_mut();
    // SAFETY: `GetCurrentProcess` returns a pseudo-handle that needs no
    // cleanup; `token` is a valid out pointer.
    if unsafe { OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) } == 0 {
        tracing::warn!("OpenProcessToken failed, assuming not elevated");
        return false;
    }

    // SAFETY: all-zero is a valid `TOKEN_ELEVATION` (a single DWORD).
    let mut elevation: TOKEN_ELEVATION = unsafe { mem::zeroed() };
    let mut size: DWORD = 0;
    #[allow(clippy::cast_possible_truncation)]
    let len = mem::size_of::<TOKEN_ELEVATION>() as DWORD;
    // SAFETY: `token` was opened with TOKEN_QUERY above, and the buffer is
    // exactly `len` bytes of a `TOKEN_ELEVATION`.
    let ok = unsafe {
        GetTokenInformation(
            token,
            TokenElevation,
            ptr::addr_of_mut!(elevation).cast(),
            len,
            &mut size,
        )
    } != 0;
    // SAFETY: `token` is an open handle owned by this function.
    unsafe { CloseHandle(token) };

    ok && elevation.TokenIsElevated != 0
}

/// Checks whether the effective user is root.
#[cfg(unix)]
#[must_use]
pub fn is_effective_root() -> bool {
    // SAFETY: `geteuid` has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_flag_maps_both_ways() {
        assert_eq!(Privilege::from_flag(true), Privilege::Elevated);
        assert_eq!(Privilege::from_flag(false), Privilege::Unelevated);
        assert!(Privilege::Elevated.is_elevated());
        assert!(!Privilege::Unelevated.is_elevated());
    }

    #[cfg(unix)]
    #[test]
    fn detect_matches_effective_uid() {
        assert_eq!(Privilege::detect().is_elevated(), is_effective_root());
    }

    #[cfg(windows)]
    #[test]
    fn detect_matches_token() {
        assert_eq!(Privilege::detect().is_elevated(), is_token_elevated());
    }
}
