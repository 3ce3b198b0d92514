// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Simple stderr backend for the [`log`] crate.
//!
//! The generator runs as a `grub.d` script, where stdout is captured verbatim into `grub.cfg`. Every diagnostic
//! therefore has to go to stderr, which `grub-mkconfig` passes through to the terminal.

use std::io::Write;

use log::{LevelFilter, Metadata, Record};

/// A simple logging backend that writes to stderr.
pub struct StderrLogger {
    /// The most verbose level that will be written.
    level: LevelFilter,
}

impl StderrLogger {
    /// Constructs a new [`StderrLogger`].
    #[must_use = "Has no effect if the result is unused"]
    pub const fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    /// Constructs a new [`StderrLogger`], then immediately leaks it so that it can be used with `set_logger`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn static_new(level: LevelFilter) -> &'static Self {
        Box::leak(Box::new(Self::new(level)))
    }

    /// Installs this logger as the global logger and sets the maximum level to match.
    ///
    /// If a logger was already installed, this does nothing.
    pub fn install(&'static self) {
        let _ = log::set_logger(self).map(|()| log::set_max_level(self.level));
    }
}

impl Default for StderrLogger {
    fn default() -> Self {
        Self::new(LevelFilter::Warn)
    }
}

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let level = record.level();
            let file = record.file().unwrap_or_default();
            let line = record.line().unwrap_or_default();
            let args = record.args();
            let _ = writeln!(std::io::stderr().lock(), "[{level} {file}:{line}] - {args}");
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}
