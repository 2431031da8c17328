//! Blocking subprocess invocation.

use anyhow::{Context, Result};
use log::debug;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use super::RealRuntime;

/// A command line to execute: program, arguments and optional working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        command
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished subprocess. Streams are decoded lossily and trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn run_impl(&self, invocation: &Invocation) -> Result<bool> {
        debug!("Running {}", invocation);
        let status = invocation
            .command()
            .status()
            .with_context(|| format!("Failed to execute {}", invocation.program.display()))?;
        debug!("{} exited with {}", invocation.program.display(), status);
        Ok(status.success())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn output_impl(&self, invocation: &Invocation) -> Result<CapturedOutput> {
        debug!("Capturing output of {}", invocation);
        let output = invocation
            .command()
            .output()
            .with_context(|| format!("Failed to execute {}", invocation.program.display()))?;
        Ok(CapturedOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Runtime;

    #[test]
    fn test_invocation_builder_and_display() {
        let invocation = Invocation::new("/env/bin/pip")
            .arg("install")
            .args(["--upgrade", "grin"])
            .current_dir("/work");

        assert_eq!(invocation.args, vec!["install", "--upgrade", "grin"]);
        assert_eq!(invocation.cwd, Some(PathBuf::from("/work")));
        assert_eq!(invocation.to_string(), "/env/bin/pip install --upgrade grin");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_reports_exit_status() {
        let runtime = RealRuntime;
        assert!(runtime.run(&Invocation::new("true")).unwrap());
        assert!(!runtime.run(&Invocation::new("false")).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_output_captures_and_trims() {
        let runtime = RealRuntime;
        let dir = tempfile::tempdir().unwrap();
        let invocation = Invocation::new("sh")
            .args(["-c", "pwd; echo oops >&2"])
            .current_dir(dir.path());

        let output = runtime.output(&invocation).unwrap();
        assert!(output.success);
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(PathBuf::from(output.stdout).canonicalize().unwrap(), expected);
        assert_eq!(output.stderr, "oops");
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let runtime = RealRuntime;
        let result = runtime.run(&Invocation::new("/nonexistent/program/for/pipsi"));
        assert!(result.is_err());
    }
}
