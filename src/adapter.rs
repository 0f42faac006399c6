//! Active adapter discovery.
//!
//! Adapters are listed through PowerShell's `Get-NetAdapter` first. When that
//! fails or returns nothing, the `netsh interface show interface` text table
//! is parsed instead.

use crate::command::{CommandRunner, Invocation};

/// Lists physical adapters that are up.
const LIST_ADAPTERS_SCRIPT: &str = "Get-NetAdapter | Where-Object { $_.Status -eq 'Up' -and -not $_.Virtual -and $_.HardwareInterface } | Select-Object -ExpandProperty Name";

/// Connection state that marks a `netsh` row as active.
const CONNECTED: &str = "connected";

/// Discovers currently active network adapters.
///
/// Each call re-queries the system; the returned names are a snapshot.
pub struct AdapterDirectory<'r, R: ?Sized> {
    runner: &'r R,
}

impl<'r, R: CommandRunner + ?Sized> AdapterDirectory<'r, R> {
    /// Creates a directory that queries through `runner`.
    #[must_use]
    pub const fn new(runner: &'r R) -> Self {
        Self { runner }
    }

    /// Returns the names of active, physical adapters in system order.
    ///
    /// Never fails: if neither query mechanism produces a name the result is
    /// empty.
    #[must_use]
    pub fn list_active_adapters(&self) -> Vec<String> {
        let names = self.query_primary();
        if !names.is_empty() {
            tracing::debug!(count = names.len(), "Discovered adapters via Get-NetAdapter");
            return names;
        }

        let names = self.query_fallback();
        tracing::debug!(count = names.len(), "Discovered adapters via netsh");
        names
    }

    fn query_primary(&self) -> Vec<String> {
        match self.runner.run(&Invocation::powershell(LIST_ADAPTERS_SCRIPT)) {
            Ok(out) if out.is_success() => parse_name_lines(&out.stdout),
            Ok(out) => {
                tracing::warn!(
                    exit_code = out.exit_code,
                    detail = %out.diagnostic(),
                    "Get-NetAdapter failed, falling back to netsh"
                );
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Get-NetAdapter unavailable, falling back to netsh");
                Vec::new()
            }
        }
    }

    fn query_fallback(&self) -> Vec<String> {
        match self
            .runner
            .run(&Invocation::netsh(["interface", "show", "interface"]))
        {
            Ok(out) if out.is_success() => parse_interface_table(&out.stdout),
            Ok(out) => {
                tracing::warn!(
                    exit_code = out.exit_code,
                    detail = %out.diagnostic(),
                    "netsh interface listing failed"
                );
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "netsh unavailable");
                Vec::new()
            }
        }
    }
}

/// Parses one adapter name per line, dropping blank lines.
fn parse_name_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses the `netsh interface show interface` table.
///
/// ```text
/// Admin State    State          Type             Interface Name
/// -------------------------------------------------------------------------
/// Enabled        Connected      Dedicated        Ethernet
/// ```
///
/// Rows need at least four whitespace-separated fields. The third field from
/// the end is read as the connection state and everything from the fourth
/// field on is the name. Only rows whose state is `Connected` (any case) are
/// kept.
#[must_use]
pub fn parse_interface_table(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !line.starts_with("Admin State") && !line.starts_with("---")
        })
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return None;
            }
            let state = fields[fields.len() - 3];
            if !state.eq_ignore_ascii_case(CONNECTED) {
                return None;
            }
            Some(fields[3..].join(" "))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use crate::error::{Result, SwitcherError};

    const TABLE: &str = "\r\n\
Admin State    State          Type             Interface Name\r\n\
-------------------------------------------------------------------------\r\n\
Enabled        Connected      Dedicated        Ethernet\r\n\
Enabled        Disconnected   Dedicated        Wi-Fi\r\n\
Enabled        CONNECTED      Dedicated        Ethernet-2\r\n\
Disabled       Disconnected   Dedicated        Bluetooth\r\n";

    #[test]
    fn table_keeps_connected_rows_only() {
        assert_eq!(parse_interface_table(TABLE), vec!["Ethernet", "Ethernet-2"]);
    }

    #[test]
    fn table_state_is_third_field_from_end() {
        // The second column says Connected, but the state field counted from
        // the end lands on the type column.
        assert!(
            parse_interface_table("Enabled        Connected      Dedicated        Ethernet 2\n")
                .is_empty()
        );
        assert_eq!(
            parse_interface_table("Enabled Disconnected Dedicated Connected Foo Bar\n"),
            vec!["Connected Foo Bar"]
        );
    }

    #[test]
    fn table_skips_short_rows() {
        assert!(parse_interface_table("Enabled Connected Dedicated\n").is_empty());
        assert!(parse_interface_table("").is_empty());
    }

    #[test]
    fn name_lines_are_trimmed() {
        assert_eq!(
            parse_name_lines("  Ethernet \r\n\r\nWi-Fi\n   \n"),
            vec!["Ethernet", "Wi-Fi"]
        );
    }

    #[test]
    fn primary_result_wins() {
        let runner = |inv: &Invocation| -> Result<CommandOutput> {
            assert_eq!(inv.program, "powershell", "netsh must not be queried");
            Ok(CommandOutput::success("Ethernet\r\nWi-Fi\r\n"))
        };
        let dir = AdapterDirectory::new(&runner);
        assert_eq!(dir.list_active_adapters(), vec!["Ethernet", "Wi-Fi"]);
    }

    #[test]
    fn empty_primary_falls_back_to_netsh() {
        let runner = |inv: &Invocation| -> Result<CommandOutput> {
            if inv.program == "powershell" {
                Ok(CommandOutput::success("\r\n"))
            } else {
                assert_eq!(inv.args, vec!["interface", "show", "interface"]);
                Ok(CommandOutput::success(TABLE))
            }
        };
        let dir = AdapterDirectory::new(&runner);
        assert_eq!(dir.list_active_adapters(), vec!["Ethernet", "Ethernet-2"]);
    }

    #[test]
    fn launch_failures_yield_empty_list() {
        let runner = |inv: &Invocation| -> Result<CommandOutput> {
            Err(SwitcherError::LaunchFailed {
                program: inv.program.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        };
        assert!(AdapterDirectory::new(&runner).list_active_adapters().is_empty());
    }

    #[test]
    fn failing_netsh_yields_empty_list() {
        let runner = |inv: &Invocation| -> Result<CommandOutput> {
            if inv.program == "powershell" {
                Ok(CommandOutput::failure(1, "not recognized"))
            } else {
                Ok(CommandOutput {
                    exit_code: 1,
                    stdout: TABLE.to_string(),
                    stderr: String::new(),
                })
            }
        };
        assert!(AdapterDirectory::new(&runner).list_active_adapters().is_empty());
    }
}
