//! Caller-facing entry point.

use crate::adapter::AdapterDirectory;
use crate::command::{CommandRunner, SystemRunner};
use crate::engine::{DnsEngine, OperationOutcome};
use crate::error::Result;
use crate::privilege::Privilege;
use crate::profile::DnsProfile;

/// Which adapters an action targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterSelection {
    /// Every adapter found by discovery.
    All,
    /// Only these adapters, in this order.
    Only(Vec<String>),
}

impl AdapterSelection {
    /// Resolves the selection against a discovery snapshot.
    ///
    /// An empty result is returned as is; the engine rejects it.
    #[must_use]
    pub fn resolve(&self, discovered: &[String]) -> Vec<String> {
        match self {
            Self::All => discovered.to_vec(),
            Self::Only(names) => names.clone(),
        }
    }
}

/// Discovers adapters and applies or resets their DNS settings.
///
/// Every call blocks until the underlying commands exit. A GUI caller should
/// run these off its event thread.
///
/// # Example
///
/// ```rust,ignore
/// use dns_switcher::{DnsSwitcher, Privilege, ProfileSet, SystemRunner};
///
/// let runner = SystemRunner::new();
/// let switcher = DnsSwitcher::new(runner, Privilege::detect());
///
/// let adapters = switcher.list_active_adapters();
/// let profiles = ProfileSet::builtin();
/// let outcome = switcher.apply_named_profile(&adapters, profiles.require("Cloudflare")?)?;
/// println!("{outcome}");
/// ```
pub struct DnsSwitcher<R = SystemRunner> {
    runner: R,
    privilege: Privilege,
}

impl DnsSwitcher<SystemRunner> {
    /// Creates a switcher that runs real commands and detects its own
    /// privilege level.
    #[must_use]
    pub fn system() -> Self {
        let runner = SystemRunner::new();
        let privilege = Privilege::detect();
        if !privilege.is_elevated() {
            tracing::warn!("Not running as administrator; DNS changes will be refused");
        }
        Self::new(runner, privilege)
    }
}

impl<R: CommandRunner> DnsSwitcher<R> {
    /// Creates a switcher over `runner` with an explicit privilege level.
    #[must_use]
    pub const fn new(runner: R, privilege: Privilege) -> Self {
        Self { runner, privilege }
    }

    /// The privilege level this switcher was built with.
    #[must_use]
    pub const fn privilege(&self) -> Privilege {
        self.privilege
    }

    /// The command runner in use.
    #[must_use]
    pub const fn runner(&self) -> &R {
        &self.runner
    }

    /// Names of active, physical adapters. See [`AdapterDirectory`].
    #[must_use]
    pub fn list_active_adapters(&self) -> Vec<String> {
        AdapterDirectory::new(&self.runner).list_active_adapters()
    }

    /// Sets `ipv4` then `ipv6` as the resolvers of `adapters`.
    ///
    /// # Errors
    ///
    /// See [`DnsEngine::apply`].
    pub fn apply_profile<A, S>(&self, adapters: &[A], ipv4: &[S], ipv6: &[S]) -> Result<OperationOutcome>
    where
        A: AsRef<str>,
        S: AsRef<str>,
    {
        self.engine().apply(adapters, ipv4, ipv6)
    }

    /// Applies a loaded profile to `adapters`.
    ///
    /// # Errors
    ///
    /// See [`DnsEngine::apply`].
    pub fn apply_named_profile<A: AsRef<str>>(
        &self,
        adapters: &[A],
        profile: &DnsProfile,
    ) -> Result<OperationOutcome> {
        tracing::info!(profile = %profile.name, adapters = adapters.len(), "Applying DNS profile");
        self.engine().apply(adapters, &profile.ipv4, &profile.ipv6)
    }

    /// Reverts `adapters` to automatic (DHCP) resolvers.
    ///
    /// # Errors
    ///
    /// See [`DnsEngine::reset`].
    pub fn reset_to_automatic<A: AsRef<str>>(&self, adapters: &[A]) -> Result<OperationOutcome> {
        self.engine().reset(adapters)
    }

    fn engine(&self) -> DnsEngine<'_, R> {
        DnsEngine::new(&self.runner, self.privilege)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_all_takes_snapshot() {
        let discovered = vec!["Ethernet".to_string(), "Wi-Fi".to_string()];
        assert_eq!(AdapterSelection::All.resolve(&discovered), discovered);
        assert!(AdapterSelection::All.resolve(&[]).is_empty());
    }

    #[test]
    fn selection_only_keeps_order() {
        let discovered = vec!["Ethernet".to_string(), "Wi-Fi".to_string()];
        let only = AdapterSelection::Only(vec!["Wi-Fi".into(), "Ethernet".into()]);
        assert_eq!(only.resolve(&discovered), vec!["Wi-Fi", "Ethernet"]);
    }
}
