//! DNS configuration engine.
//!
//! Applies or resets resolver addresses on a set of adapters. Every adapter
//! is first tried with PowerShell's `Set-DnsClientServerAddress` (both
//! address families in one call). If that fails for any adapter, an
//! IPv4-only `netsh` pass runs over *all* target adapters. IPv6 has no
//! fallback.
//!
//! Nothing here returns an error for a command that ran and failed: each
//! attempt becomes a [`MechanismResult`] in the returned
//! [`OperationOutcome`], and the aggregate flag summarizes them.

use crate::command::{CommandRunner, Invocation, ps_array, ps_quote};
use crate::error::{Result, SwitcherError};
use crate::privilege::Privilege;
use crate::profile::DnsProfile;
use std::fmt;

/// Which configuration interface produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mechanism {
    /// PowerShell `DnsClient` cmdlets.
    Primary,
    /// Legacy `netsh interface ipv4` commands.
    Fallback,
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        })
    }
}

/// The concrete command an attempt issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Set the full server list for both families.
    SetServers,
    /// Clear all server overrides for both families.
    ResetServers,
    /// Switch the IPv4 server source back to DHCP.
    SetSourceDhcp,
    /// Set the first IPv4 address as the static primary server.
    SetPrimary,
    /// Add a further IPv4 server at an explicit priority index.
    AddServer {
        /// 1-based priority index; additional servers start at 2.
        index: usize,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetServers => f.write_str("set DNS servers"),
            Self::ResetServers => f.write_str("reset DNS servers"),
            Self::SetSourceDhcp => f.write_str("set IPv4 DNS source to DHCP"),
            Self::SetPrimary => f.write_str("set primary IPv4 DNS server"),
            Self::AddServer { index } => write!(f, "add IPv4 DNS server #{index}"),
        }
    }
}

/// Outcome of a single command against a single adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MechanismResult {
    /// Adapter the command targeted.
    pub adapter: String,
    /// Interface used.
    pub mechanism: Mechanism,
    /// What the command did.
    pub step: Step,
    /// Whether the command launched and exited with code 0.
    pub success: bool,
    /// Human-readable detail: the applied values on success, the captured
    /// diagnostic text on failure.
    pub detail: String,
}

impl fmt::Display for MechanismResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} {}: {}",
            self.mechanism,
            self.adapter,
            self.step,
            if self.success { "succeeded" } else { "failed" },
            self.detail
        )
    }
}

/// Aggregated result of an apply or reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    /// `true` when every adapter ended up with the requested configuration.
    pub overall_success: bool,
    /// Every attempt, in the order it was made.
    pub log: Vec<MechanismResult>,
}

impl OperationOutcome {
    /// Returns `true` if no command was issued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Entries produced by the fallback mechanism.
    pub fn fallback_entries(&self) -> impl Iterator<Item = &MechanismResult> {
        self.log
            .iter()
            .filter(|r| r.mechanism == Mechanism::Fallback)
    }

    /// Entries for one adapter, in order.
    pub fn entries_for<'a>(&'a self, adapter: &'a str) -> impl Iterator<Item = &'a MechanismResult> {
        self.log.iter().filter(move |r| r.adapter == adapter)
    }
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.log.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

/// What a [`ConfigurationRequest`] asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestMode {
    /// Set explicit resolver lists. Order within each list is priority order.
    Apply {
        /// IPv4 resolvers.
        ipv4: Vec<String>,
        /// IPv6 resolvers.
        ipv6: Vec<String>,
    },
    /// Revert to DHCP-assigned resolvers.
    Reset,
}

/// One user action against a set of adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationRequest {
    /// Target adapters, in the order they are processed.
    pub adapters: Vec<String>,
    /// Requested state.
    pub mode: RequestMode,
}

impl ConfigurationRequest {
    /// Requests explicit resolver lists on `adapters`.
    #[must_use]
    pub fn apply<I, S>(adapters: I, ipv4: Vec<String>, ipv6: Vec<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            adapters: adapters.into_iter().map(Into::into).collect(),
            mode: RequestMode::Apply { ipv4, ipv6 },
        }
    }

    /// Requests the resolvers of `profile` on `adapters`.
    #[must_use]
    pub fn apply_profile<I, S>(adapters: I, profile: &DnsProfile) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::apply(adapters, profile.ipv4.clone(), profile.ipv6.clone())
    }

    /// Requests a revert to automatic resolvers on `adapters`.
    #[must_use]
    pub fn reset<I, S>(adapters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            adapters: adapters.into_iter().map(Into::into).collect(),
            mode: RequestMode::Reset,
        }
    }
}

/// Accumulator threaded through each pass over the adapters.
#[derive(Default)]
struct Ledger {
    log: Vec<MechanismResult>,
    launched: usize,
}

impl Ledger {
    fn record(mut self, result: MechanismResult, launched: bool) -> Self {
        self.launched += usize::from(launched);
        self.log.push(result);
        self
    }

    fn extend(mut self, other: Self) -> Self {
        self.launched += other.launched;
        self.log.extend(other.log);
        self
    }

    fn failed_adapters(&self) -> Vec<&str> {
        self.log
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.adapter.as_str())
            .collect()
    }

    /// Converts to an outcome, or to an error if nothing could be launched.
    fn finish(self, overall_success: bool) -> Result<OperationOutcome> {
        if self.launched == 0 && !self.log.is_empty() {
            return Err(SwitcherError::MechanismsUnavailable { log: self.log });
        }
        Ok(OperationOutcome {
            overall_success,
            log: self.log,
        })
    }
}

/// Applies and resets adapter DNS settings.
///
/// Execution is strictly sequential: adapters in input order, and the
/// fallback pass only after the whole primary pass.
pub struct DnsEngine<'r, R: ?Sized> {
    runner: &'r R,
    privilege: Privilege,
}

impl<'r, R: CommandRunner + ?Sized> DnsEngine<'r, R> {
    /// Creates an engine issuing commands through `runner`.
    #[must_use]
    pub const fn new(runner: &'r R, privilege: Privilege) -> Self {
        Self { runner, privilege }
    }

    /// Sets `ipv4` followed by `ipv6` as the resolvers of each adapter.
    ///
    /// With both lists empty nothing is touched and the outcome is a success
    /// with an empty log, whatever the privilege level.
    ///
    /// # Errors
    ///
    /// [`SwitcherError::EmptyAdapterSet`] or, when there is something to
    /// apply, [`SwitcherError::NotElevated`] before any command runs;
    /// [`SwitcherError::MechanismsUnavailable`] if no command could be
    /// launched at all.
    pub fn apply<A, S>(&self, adapters: &[A], ipv4: &[S], ipv6: &[S]) -> Result<OperationOutcome>
    where
        A: AsRef<str>,
        S: AsRef<str>,
    {
        require_adapters(adapters)?;

        let ipv4: Vec<&str> = ipv4.iter().map(AsRef::as_ref).collect();
        let ipv6: Vec<&str> = ipv6.iter().map(AsRef::as_ref).collect();
        if ipv4.is_empty() && ipv6.is_empty() {
            tracing::debug!("No resolvers requested, leaving adapters untouched");
            return Ok(OperationOutcome {
                overall_success: true,
                log: Vec::new(),
            });
        }
        self.require_elevation()?;

        let servers: Vec<&str> = ipv4.iter().chain(&ipv6).copied().collect();
        let primary = adapters.iter().fold(Ledger::default(), |ledger, adapter| {
            let adapter = adapter.as_ref();
            let (result, launched) = self.attempt(
                adapter,
                Mechanism::Primary,
                Step::SetServers,
                &set_servers_invocation(adapter, &servers),
                || servers.join(", "),
            );
            ledger.record(result, launched)
        });

        let failed: Vec<String> = primary
            .failed_adapters()
            .into_iter()
            .map(str::to_string)
            .collect();
        if failed.is_empty() {
            return primary.finish(true);
        }
        if ipv4.is_empty() {
            tracing::warn!(
                failed = failed.len(),
                "Primary mechanism failed and IPv6 has no fallback"
            );
            return primary.finish(false);
        }

        tracing::info!(failed = failed.len(), "Retrying IPv4 via netsh on all adapters");
        let fallback = adapters.iter().fold(Ledger::default(), |ledger, adapter| {
            ledger.extend(self.apply_ipv4_fallback(adapter.as_ref(), &ipv4))
        });

        let recovered = failed.iter().all(|adapter| {
            fallback.log.iter().any(|r| {
                r.adapter == *adapter && r.step == Step::SetPrimary && r.success
            })
        });
        primary.extend(fallback).finish(recovered)
    }

    /// Reverts each adapter's resolvers to automatic (DHCP).
    ///
    /// If any primary reset fails, IPv4 is switched back to DHCP via `netsh`
    /// on every adapter; IPv6 is left as is. The outcome stays a failure in
    /// that case even when the fallback succeeds.
    ///
    /// # Errors
    ///
    /// Same as [`apply`](Self::apply).
    pub fn reset<A: AsRef<str>>(&self, adapters: &[A]) -> Result<OperationOutcome> {
        require_adapters(adapters)?;
        self.require_elevation()?;

        let primary = adapters.iter().fold(Ledger::default(), |ledger, adapter| {
            let adapter = adapter.as_ref();
            let (result, launched) = self.attempt(
                adapter,
                Mechanism::Primary,
                Step::ResetServers,
                &reset_servers_invocation(adapter),
                || "reverted to automatic (DHCP)".to_string(),
            );
            ledger.record(result, launched)
        });

        if primary.failed_adapters().is_empty() {
            return primary.finish(true);
        }

        tracing::info!("Resetting IPv4 via netsh on all adapters");
        let fallback = adapters.iter().fold(Ledger::default(), |ledger, adapter| {
            let adapter = adapter.as_ref();
            let (result, launched) = self.attempt(
                adapter,
                Mechanism::Fallback,
                Step::SetSourceDhcp,
                &set_source_dhcp_invocation(adapter),
                || "IPv4 reverted to DHCP".to_string(),
            );
            ledger.record(result, launched)
        });
        primary.extend(fallback).finish(false)
    }

    /// Runs a prepared request.
    ///
    /// # Errors
    ///
    /// Same as [`apply`](Self::apply).
    pub fn execute(&self, request: ConfigurationRequest) -> Result<OperationOutcome> {
        match request.mode {
            RequestMode::Apply { ipv4, ipv6 } => self.apply(&request.adapters, &ipv4, &ipv6),
            RequestMode::Reset => self.reset(&request.adapters),
        }
    }

    fn require_elevation(&self) -> Result<()> {
        if self.privilege.is_elevated() {
            Ok(())
        } else {
            Err(SwitcherError::NotElevated)
        }
    }

    /// IPv4 `netsh` sequence for one adapter: DHCP source, static primary,
    /// then each further server at index 2, 3, ...
    fn apply_ipv4_fallback(&self, adapter: &str, ipv4: &[&str]) -> Ledger {
        let (result, launched) = self.attempt(
            adapter,
            Mechanism::Fallback,
            Step::SetSourceDhcp,
            &set_source_dhcp_invocation(adapter),
            || "cleared static IPv4 servers".to_string(),
        );
        let ledger = Ledger::default().record(result, launched);

        let Some((first, rest)) = ipv4.split_first() else {
            return ledger;
        };
        let (result, launched) = self.attempt(
            adapter,
            Mechanism::Fallback,
            Step::SetPrimary,
            &set_primary_invocation(adapter, first),
            || (*first).to_string(),
        );
        let primary_ok = result.success;
        let ledger = ledger.record(result, launched);
        if !primary_ok {
            return ledger;
        }

        rest.iter()
            .zip(2..)
            .fold(ledger, |ledger, (server, index)| {
                let (result, launched) = self.attempt(
                    adapter,
                    Mechanism::Fallback,
                    Step::AddServer { index },
                    &add_server_invocation(adapter, server, index),
                    || (*server).to_string(),
                );
                ledger.record(result, launched)
            })
    }

    /// Runs one command and turns its outcome into a log entry.
    ///
    /// The returned flag tells whether the process could be launched.
    fn attempt(
        &self,
        adapter: &str,
        mechanism: Mechanism,
        step: Step,
        invocation: &Invocation,
        success_detail: impl FnOnce() -> String,
    ) -> (MechanismResult, bool) {
        let (success, detail, launched) = match self.runner.run(invocation) {
            Ok(out) if out.is_success() => (true, success_detail(), true),
            Ok(out) => (false, out.diagnostic(), true),
            Err(e) => (false, e.to_string(), false),
        };

        if success {
            tracing::info!(adapter = %adapter, %mechanism, %step, %detail, "DNS command succeeded");
        } else {
            tracing::warn!(adapter = %adapter, %mechanism, %step, %detail, "DNS command failed");
        }

        let result = MechanismResult {
            adapter: adapter.to_string(),
            mechanism,
            step,
            success,
            detail,
        };
        (result, launched)
    }
}

fn require_adapters<A>(adapters: &[A]) -> Result<()> {
    if adapters.is_empty() {
        return Err(SwitcherError::EmptyAdapterSet);
    }
    Ok(())
}

fn set_servers_invocation(adapter: &str, servers: &[&str]) -> Invocation {
    Invocation::powershell(format!(
        "$ErrorActionPreference='Stop'; Set-DnsClientServerAddress -InterfaceAlias {} -ServerAddresses {}",
        ps_quote(adapter),
        ps_array(servers)
    ))
}

fn reset_servers_invocation(adapter: &str) -> Invocation {
    Invocation::powershell(format!(
        "$ErrorActionPreference='Stop'; Set-DnsClientServerAddress -InterfaceAlias {} -ResetServerAddresses",
        ps_quote(adapter)
    ))
}

fn set_source_dhcp_invocation(adapter: &str) -> Invocation {
    Invocation::netsh([
        "interface".to_string(),
        "ipv4".to_string(),
        "set".to_string(),
        "dnsservers".to_string(),
        format!("name={adapter}"),
        "source=dhcp".to_string(),
    ])
}

fn set_primary_invocation(adapter: &str, server: &str) -> Invocation {
    Invocation::netsh([
        "interface".to_string(),
        "ipv4".to_string(),
        "set".to_string(),
        "dnsservers".to_string(),
        format!("name={adapter}"),
        "static".to_string(),
        server.to_string(),
        "primary".to_string(),
    ])
}

fn add_server_invocation(adapter: &str, server: &str, index: usize) -> Invocation {
    Invocation::netsh([
        "interface".to_string(),
        "ipv4".to_string(),
        "add".to_string(),
        "dnsservers".to_string(),
        format!("name={adapter}"),
        server.to_string(),
        format!("index={index}"),
    ])
}
