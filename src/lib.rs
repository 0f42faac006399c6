//! # dns-switcher
//!
//! Apply named DNS resolver profiles to a Windows host's active network
//! adapters, or revert them to automatic (DHCP) resolvers.
//!
//! Changes go through PowerShell's `DnsClient` cmdlets first. When those
//! fail, IPv4 settings are retried through legacy `netsh` commands. Each
//! command's result is collected into an [`OperationOutcome`] so a front-end
//! can show exactly what happened per adapter.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use dns_switcher::{DnsSwitcher, ProfileSet, default_profile_path};
//!
//! let profiles = ProfileSet::load_or_default(&default_profile_path()?);
//! let switcher = DnsSwitcher::system();
//!
//! let adapters = switcher.list_active_adapters();
//! let outcome = switcher.apply_named_profile(&adapters, profiles.require("Google")?)?;
//! if !outcome.overall_success {
//!     eprintln!("{outcome}");
//! }
//!
//! // Later: back to DHCP.
//! switcher.reset_to_automatic(&adapters)?;
//! ```
//!
//! ## Fallback behavior
//!
//! - **Apply**: if `Set-DnsClientServerAddress` fails on any adapter and the
//!   profile has IPv4 addresses, every target adapter is reconfigured with
//!   `netsh interface ipv4 set/add dnsservers`. IPv6 has no fallback.
//! - **Reset**: if `-ResetServerAddresses` fails on any adapter, IPv4 is set
//!   back to DHCP with `netsh` on every target adapter. The outcome still
//!   reports failure because IPv6 may not have been reverted.
//!
//! ## Testing without a host
//!
//! Anything implementing [`CommandRunner`], including a plain closure, can
//! stand in for the real process launcher:
//!
//! ```
//! use dns_switcher::{CommandOutput, DnsEngine, Invocation, Privilege, Result};
//!
//! let runner = |_: &Invocation| -> Result<CommandOutput> { Ok(CommandOutput::success("")) };
//! let engine = DnsEngine::new(&runner, Privilege::Elevated);
//!
//! let outcome = engine.apply(&["Ethernet"], &["1.1.1.1"], &[]).unwrap();
//! assert!(outcome.overall_success);
//! assert_eq!(outcome.log.len(), 1);
//! ```
//!
//! ## Permissions
//!
//! Changing adapter DNS settings requires administrator rights. The caller
//! is responsible for elevation and passes the result in as a [`Privilege`].

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod adapter;
pub mod command;
pub mod engine;
pub mod error;
pub mod privilege;
pub mod profile;
pub mod switcher;

pub use adapter::{AdapterDirectory, parse_interface_table};
pub use command::{CommandOutput, CommandRunner, Invocation, SystemRunner};
pub use engine::{
    ConfigurationRequest, DnsEngine, Mechanism, MechanismResult, OperationOutcome, RequestMode,
    Step,
};
pub use error::{Result, SwitcherError};
pub use privilege::Privilege;
pub use profile::{DnsProfile, PROFILE_FILE_NAME, ProfileSet, default_profile_path};
pub use switcher::{AdapterSelection, DnsSwitcher};
