// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Initrd discovery for a kernel.
//!
//! A kernel gets at most one real initrd, found by trying a fixed list of naming conventions in order, and any
//! number of early images (usually CPU microcode) which are loaded before it.

use std::path::Path;

use crate::{config::GrubConfig, system::fs::first_existing_file};

/// The initrds loaded alongside one kernel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InitrdSet {
    /// Early images, stock images before custom ones. Only images present next to the kernel are kept.
    pub early: Vec<String>,

    /// The real initrd, if one exists for the kernel version.
    pub real: Option<String>,
}

impl InitrdSet {
    /// Finds the initrds for a kernel version inside `directory`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(directory: &Path, version: &str, arch_hint: &str, config: &GrubConfig) -> Self {
        Self {
            early: initrd_early(directory, config),
            real: initrd_real(directory, version, arch_hint),
        }
    }

    /// Checks if there is no initrd to load.
    #[must_use = "Has no effect if the result is unused"]
    pub fn is_empty(&self) -> bool {
        self.early.is_empty() && self.real.is_none()
    }

    /// Every initrd file name in load order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.early
            .iter()
            .map(String::as_str)
            .chain(self.real.as_deref())
    }

    /// Every initrd in load order, joined to a directory as GRUB sees it.
    #[must_use = "Has no effect if the result is unused"]
    pub fn paths(&self, rel_directory: &str) -> Vec<String> {
        let rel_directory = rel_directory.trim_end_matches('/');
        self.names()
            .map(|name| format!("{rel_directory}/{name}"))
            .collect()
    }
}

/// Finds the real initrd of a kernel version, trying each naming convention in priority order.
#[must_use = "Has no effect if the result is unused"]
pub fn initrd_real(directory: &Path, version: &str, arch_hint: &str) -> Option<String> {
    first_existing_file(
        directory,
        [
            format!("initrd.img-{version}"),
            format!("initrd-{version}.img"),
            format!("initrd-{version}.gz"),
            format!("initrd-{version}"),
            format!("initramfs-{version}.img"),
            format!("initramfs-genkernel-{version}"),
            format!("initramfs-genkernel-{arch_hint}-{version}"),
        ],
    )
}

/// Finds the configured early images that exist in `directory`.
#[must_use = "Has no effect if the result is unused"]
pub fn initrd_early(directory: &Path, config: &GrubConfig) -> Vec<String> {
    config
        .early_initrd_stock
        .iter()
        .chain(&config.early_initrd_custom)
        .filter(|name| directory.join(name).is_file())
        .cloned()
        .collect()
}
