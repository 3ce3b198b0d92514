// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! External GRUB and system commands.
//!
//! The generator needs a handful of answers that only the GRUB userland can give: where a directory lives relative
//! to the filesystem GRUB reads it from (`grub-mkrelpath`), and which modules and search hints are needed to reach a
//! device (`grub-probe`). These go through the [`GrubTools`] trait so the rest of the crate can be driven without a
//! real GRUB installation.

use std::{
    fmt,
    path::Path,
    process::{Command, ExitStatus},
};

use log::debug;
use thiserror::Error;

/// Environment variable that makes ZFS report full vdev paths, which `grub-probe` needs.
const VDEV_NAME_PATH: (&str, &str) = ("ZPOOL_VDEV_NAME_PATH", "1");

/// An error that may result from running an external command.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The command could not be started at all.
    #[error("Failed to run {command}: {source}")]
    Spawn {
        /// The command that was run.
        command: String,

        /// The reason it could not be started.
        #[source]
        source: std::io::Error,
    },

    /// The command exited with a non-zero status.
    #[error("{command} failed ({status}): {stderr}")]
    Failed {
        /// The command that was run.
        command: String,

        /// The exit status of the command.
        status: ExitStatus,

        /// Everything the command wrote to stderr.
        stderr: String,
    },

    /// The command succeeded but printed nothing where one line was required.
    #[error("{0} produced no output")]
    NoOutput(String),
}

/// The `--target` values of `grub-probe` that the generator asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeTarget {
    /// Abstraction modules (such as `zfs`, `lvm`, `cryptodisk`) that are not loaded automatically.
    Abstraction,

    /// The filesystem module for the device.
    Fs,

    /// The UUIDs of encrypted disks under the device.
    CryptodiskUuid,

    /// A device name in GRUB syntax, for `set root`.
    CompatibilityHint,

    /// The filesystem UUID, for `search --fs-uuid`.
    FsUuid,

    /// Platform specific search hints.
    HintsString,
}

impl ProbeTarget {
    /// Convert a [`ProbeTarget`] into the value passed to `--target`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Abstraction => "abstraction",
            Self::Fs => "fs",
            Self::CryptodiskUuid => "cryptodisk_uuid",
            Self::CompatibilityHint => "compatibility_hint",
            Self::FsUuid => "fs_uuid",
            Self::HintsString => "hints_string",
        }
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The GRUB userland tools consumed by the generator.
pub trait GrubTools {
    /// Returns the path of `dir` relative to the root of the filesystem it lives on, as GRUB sees it.
    ///
    /// # Errors
    ///
    /// May return an `Error` if `grub-mkrelpath` fails or prints nothing.
    fn mkrelpath(&self, dir: &Path) -> Result<String, CommandError>;

    /// Probes a set of devices for the given target, returning every line printed.
    ///
    /// # Errors
    ///
    /// May return an `Error` if `grub-probe` fails.
    fn probe(&self, devices: &[String], target: ProbeTarget) -> Result<Vec<String>, CommandError>;

    /// Returns the devices that hold the filesystem at `path`.
    ///
    /// # Errors
    ///
    /// May return an `Error` if `grub-probe` fails.
    fn probe_device(&self, path: &Path) -> Result<Vec<String>, CommandError>;
}

/// [`GrubTools`] backed by the real `grub-mkrelpath` and `grub-probe` binaries.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTools;

impl GrubTools for SystemTools {
    fn mkrelpath(&self, dir: &Path) -> Result<String, CommandError> {
        let mut cmd = Command::new("grub-mkrelpath");
        cmd.arg(dir);
        first_line(&mut cmd)
    }

    fn probe(&self, devices: &[String], target: ProbeTarget) -> Result<Vec<String>, CommandError> {
        let mut cmd = Command::new("grub-probe");
        cmd.arg("--device")
            .args(devices)
            .arg(format!("--target={target}"))
            .env(VDEV_NAME_PATH.0, VDEV_NAME_PATH.1);
        run(&mut cmd)
    }

    fn probe_device(&self, path: &Path) -> Result<Vec<String>, CommandError> {
        let mut cmd = Command::new("grub-probe");
        cmd.arg("--target=device")
            .arg(path)
            .env(VDEV_NAME_PATH.0, VDEV_NAME_PATH.1);
        run(&mut cmd)
    }
}

/// Runs a command to completion, returning its stdout split into lines.
///
/// # Errors
///
/// May return an `Error` if the command could not be started, or exited unsuccessfully. The error carries whatever
/// the command printed to stderr.
pub fn run(cmd: &mut Command) -> Result<Vec<String>, CommandError> {
    let command = describe(cmd);
    debug!("Running {command}");

    let output = cmd.output().map_err(|source| CommandError::Spawn {
        command: command.clone(),
        source,
    })?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            command,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_owned)
        .collect())
}

/// Runs a command that must print exactly one meaningful line, returning that line.
///
/// # Errors
///
/// May return an `Error` if the command fails, or its first line is empty.
pub fn first_line(cmd: &mut Command) -> Result<String, CommandError> {
    let command = describe(cmd);
    run(cmd)?
        .into_iter()
        .next()
        .filter(|line| !line.trim().is_empty())
        .ok_or(CommandError::NoOutput(command))
}

/// Returns the machine hardware name, as `uname -m` prints it.
///
/// # Errors
///
/// May return an `Error` if `uname` fails.
pub fn machine() -> Result<String, CommandError> {
    first_line(Command::new("uname").arg("-m"))
}

/// Assembles the final GRUB configuration by running `grub-mkconfig -o <output>`.
///
/// This runs every script in `/etc/grub.d`, including the one that calls back into this crate.
///
/// # Errors
///
/// May return an `Error` if `grub-mkconfig` fails. The error carries its stderr.
pub fn grub_mkconfig(output: &Path) -> Result<(), CommandError> {
    let mut cmd = Command::new("grub-mkconfig");
    cmd.arg("-o")
        .arg(output)
        .env(VDEV_NAME_PATH.0, VDEV_NAME_PATH.1);
    run(&mut cmd).map(drop)
}

/// Renders a command line for messages.
fn describe(cmd: &Command) -> String {
    let mut command = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        command.push(' ');
        command.push_str(&arg.to_string_lossy());
    }
    command
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_captures_lines() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "printf 'one\\ntwo\\n'"]);
        let lines = run(&mut cmd).expect("sh should be available in test");
        assert_eq!(lines, ["one", "two"]);
    }

    #[test]
    fn test_run_failure_carries_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo broken >&2; exit 3"]);
        let Err(CommandError::Failed { stderr, status, .. }) = run(&mut cmd) else {
            panic!("expected a failed command");
        };
        assert_eq!(stderr, "broken");
        assert_eq!(status.code(), Some(3));
    }

    #[test]
    fn test_first_line_requires_output() {
        let mut cmd = Command::new("true");
        assert!(matches!(
            first_line(&mut cmd),
            Err(CommandError::NoOutput(command)) if command == "true"
        ));
    }

    #[test]
    fn test_missing_binary() {
        let mut cmd = Command::new("zedenv-grub-this-command-does-not-exist");
        assert!(matches!(run(&mut cmd), Err(CommandError::Spawn { .. })));
    }

    #[test]
    fn test_describe() {
        let mut cmd = Command::new("grub-probe");
        cmd.args(["--device", "/dev/sda1", "--target=fs"]);
        assert_eq!(describe(&cmd), "grub-probe --device /dev/sda1 --target=fs");
    }
}
