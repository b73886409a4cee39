//! Container Engine Handle
//!
//! Thin wrapper around a container engine executable (`docker`,
//! `singularity`). Every invocation goes through a [`CommandRunner`], so the
//! engine can be swapped for a recording fake in tests.

use std::io;
use std::process::Command;

use log::{debug, error};
use thiserror::Error;

/// Failures while driving a container engine.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' exited with {status}: {output}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },

    #[error("don't know how to handle this version of singularity: {version}")]
    UnsupportedSingularity { version: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("unexpected output from '{command}': {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Captured result of one engine invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout followed by stderr, trimmed.
    pub fn combined(&self) -> String {
        let mut text = self.stdout.trim().to_string();
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr);
        }
        text
    }

    fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "a signal".to_string(),
        }
    }
}

/// Runs external programs on behalf of a [`ContainerEngine`].
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput>;
}

/// Runs programs with [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let output = Command::new(program).args(args).output()?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// An explicitly constructed handle on a container engine executable.
///
/// # Example
///
/// ```rust,no_run
/// use cwl_utils::container::ContainerEngine;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let engine = ContainerEngine::docker().connect()?;
///     let output = engine.run_checked(&["images".to_string()])?;
///     println!("{}", output.stdout);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ContainerEngine<R: CommandRunner = SystemRunner> {
    binary: String,
    runner: R,
}

impl ContainerEngine<SystemRunner> {
    /// Creates a handle on `binary`, resolved through `PATH`.
    pub fn new(binary: impl Into<String>) -> Self {
        Self::with_runner(binary, SystemRunner)
    }

    /// Handle on the local `docker` executable.
    pub fn docker() -> Self {
        Self::new("docker")
    }
}

impl<R: CommandRunner> ContainerEngine<R> {
    pub fn with_runner(binary: impl Into<String>, runner: R) -> Self {
        Self {
            binary: binary.into(),
            runner,
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Checks that the engine answers `version` before handing it out.
    pub fn connect(self) -> Result<Self, ContainerError> {
        self.run_checked(&args(["version"]))?;
        debug!("Connected to {}", self.binary);
        Ok(self)
    }

    /// Runs the engine with `args` and returns its output, whatever the
    /// exit status.
    pub fn run(&self, args: &[String]) -> Result<CommandOutput, ContainerError> {
        debug!("Running: {}", self.describe(args));

        self.runner
            .run(&self.binary, args)
            .map_err(|source| ContainerError::Spawn {
                command: self.describe(args),
                source,
            })
    }

    /// Like [`run`](Self::run), but a non-zero exit is an error carrying the
    /// command's output.
    pub fn run_checked(&self, args: &[String]) -> Result<CommandOutput, ContainerError> {
        let output = self.run(args)?;

        if !output.success() {
            let command = self.describe(args);
            let text = output.combined();
            if !text.is_empty() {
                error!("{} failed:\n{}", command, text);
            }
            return Err(ContainerError::CommandFailed {
                command,
                status: output.status_text(),
                output: text,
            });
        }

        Ok(output)
    }

    fn describe(&self, args: &[String]) -> String {
        std::iter::once(self.binary.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Builds an owned argument list from string slices.
pub(crate) fn args<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}
