//! External command execution.
//!
//! Every adapter query and DNS change goes through a [`CommandRunner`]. The
//! real implementation, [`SystemRunner`], spawns the process and blocks until
//! it exits. Tests substitute a closure returning scripted output.

use crate::error::{Result, SwitcherError};
use std::fmt;
use std::process::Command;

/// Program used for the primary (structured) mechanism.
pub const POWERSHELL: &str = "powershell";

/// Program used for the fallback (legacy, text-based) mechanism.
pub const NETSH: &str = "netsh";

/// A program plus its arguments, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable name or path.
    pub program: String,
    /// Arguments, passed to the process without shell interpretation.
    pub args: Vec<String>,
}

impl Invocation {
    /// Creates an invocation of `program` with `args`.
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Runs `script` through a non-interactive PowerShell.
    #[must_use]
    pub fn powershell(script: impl Into<String>) -> Self {
        Self::new(
            POWERSHELL,
            [
                "-NoProfile".to_string(),
                "-ExecutionPolicy".to_string(),
                "Bypass".to_string(),
                "-Command".to_string(),
                script.into(),
            ],
        )
    }

    /// Runs `netsh` with `args`.
    #[must_use]
    pub fn netsh<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(NETSH, args)
    }

    /// Returns the PowerShell script if this is a PowerShell invocation.
    #[must_use]
    pub fn script(&self) -> Option<&str> {
        if self.program != POWERSHELL {
            return None;
        }
        self.args.last().map(String::as_str)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a process that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit code; `-1` when the process was terminated without one.
    pub exit_code: i32,
    /// Full standard output.
    pub stdout: String,
    /// Full standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// A zero-exit output with the given stdout.
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed output with the given exit code and stderr.
    #[must_use]
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns `true` if the process exited with code 0.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Best available diagnostic text: stderr, then stdout, then the exit code.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("exit code {}", self.exit_code)
    }
}

/// Runs external commands.
///
/// Implementations must block until the process exits and must not turn a
/// non-zero exit into an error. Only a failure to start the process is
/// reported as [`SwitcherError::LaunchFailed`].
pub trait CommandRunner {
    /// Runs `invocation` to completion.
    ///
    /// # Errors
    ///
    /// Returns [`SwitcherError::LaunchFailed`] if the process could not be
    /// started.
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;
}

impl<F> CommandRunner for F
where
    F: Fn(&Invocation) -> Result<CommandOutput>,
{
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self(invocation)
    }
}

/// Spawns real OS processes via [`std::process::Command`].
///
/// No timeout is applied: a hung command blocks the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Creates a runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        tracing::debug!(command = %invocation, "Running command");

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .output()
            .map_err(|source| SwitcherError::LaunchFailed {
                program: invocation.program.clone(),
                source,
            })?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Quotes `value` as a single-quoted PowerShell string literal.
///
/// Single quotes inside the value are doubled, which is the only escape
/// PowerShell recognizes in verbatim strings.
#[must_use]
pub fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Formats `values` as a PowerShell array literal: `@('a','b')`.
#[must_use]
pub fn ps_array<S: AsRef<str>>(values: &[S]) -> String {
    let items: Vec<String> = values.iter().map(|v| ps_quote(v.as_ref())).collect();
    format!("@({})", items.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn powershell_invocation_shape() {
        let inv = Invocation::powershell("Get-NetAdapter");
        assert_eq!(inv.program, "powershell");
        assert_eq!(
            inv.args,
            vec!["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command", "Get-NetAdapter"]
        );
        assert_eq!(inv.script(), Some("Get-NetAdapter"));
        assert_eq!(Invocation::netsh(["interface"]).script(), None);
    }

    #[test]
    fn display_joins_args() {
        let inv = Invocation::netsh(["interface", "show", "interface"]);
        assert_eq!(inv.to_string(), "netsh interface show interface");
    }

    #[test]
    fn quoting_doubles_single_quotes() {
        assert_eq!(ps_quote("Ethernet"), "'Ethernet'");
        assert_eq!(ps_quote("Bob's NIC"), "'Bob''s NIC'");
        assert_eq!(ps_array(&["1.1.1.1", "::1"]), "@('1.1.1.1','::1')");
        assert_eq!(ps_array::<&str>(&[]), "@()");
    }

    #[test]
    fn diagnostic_prefers_stderr() {
        let out = CommandOutput {
            exit_code: 1,
            stdout: "out\n".into(),
            stderr: "  err \r\n".into(),
        };
        assert_eq!(out.diagnostic(), "err");

        let out = CommandOutput {
            exit_code: 1,
            stdout: " out ".into(),
            stderr: String::new(),
        };
        assert_eq!(out.diagnostic(), "out");

        assert_eq!(CommandOutput::failure(5, "").diagnostic(), "exit code 5");
    }

    #[test]
    fn closures_are_runners() {
        let runner =
            |inv: &Invocation| -> Result<CommandOutput> { Ok(CommandOutput::success(inv.program.clone())) };
        let out = runner.run(&Invocation::netsh(["x"])).unwrap();
        assert!(out.is_success());
        assert_eq!(out.stdout, "netsh");
    }

    #[test]
    fn missing_program_is_launch_failure() {
        let err = SystemRunner::new()
            .run(&Invocation::new("dns-switcher-no-such-program", ["x"]))
            .unwrap_err();
        assert!(matches!(err, SwitcherError::LaunchFailed { ref program, .. } if program == "dns-switcher-no-such-program"));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_not_an_error() {
        let out = SystemRunner::new()
            .run(&Invocation::new("sh", ["-c", "echo oops >&2; exit 3"]))
            .unwrap();
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stderr.trim(), "oops");
    }
}
