// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The `zedenv-grub` library crate.
//!
//! This generates GRUB menu entries for ZFS boot environments. Every boot environment keeps its own set of kernels
//! in a directory named `zedenv-<name>`, and the entries produced here boot those kernels with their root set to the
//! matching dataset, the same way the stock `10_linux` script does for a single `/boot`.
//!
//! The work is split in two halves. The [`scan`] module walks the boot environment tree and finds kernel images,
//! then the [`entry`] and [`generator`] modules turn every kernel into GRUB stanzas. A frontend (such as
//! `zedenv-grub-cli`) only needs to build a [`config::GrubConfig`] and hand it to a [`generator::Generator`].
//!
//! ## MSRV
//!
//! The minimum supported rust version is 1.88.0.

/// The primary result type that wraps around [`crate::error::GrubError`].
pub type GrubResult<T> = Result<T, crate::error::GrubError>;

pub mod config;
pub mod entry;
pub mod error;
pub mod generator;
pub mod scan;
pub mod system;
