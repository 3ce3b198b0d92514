// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`GrubError`], which encapsulates other errors

use std::path::PathBuf;

use thiserror::Error;

/// An `Error` resulting from the program.
///
/// Every variant is fatal. A generation run that hits one of these stops without printing any entries.
#[derive(Error, Debug)]
pub enum GrubError {
    /// A configuration value was missing or had an invalid value.
    #[error("Configuration Error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// The boot root, the boot environment tree, or a boot environment directory does not exist.
    #[error("\"{}\" does not exist", .0.display())]
    NotFound(PathBuf),

    /// An external command such as `grub-mkrelpath` or `grub-mkconfig` failed.
    #[error("External Command Error: {0}")]
    Command(#[from] crate::system::command::CommandError),

    /// A directory that exists could not be read.
    #[error("Filesystem Error at \"{}\": {source}", path.display())]
    Io {
        /// The path that was being read.
        path: PathBuf,

        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}
