// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`GrubConfig`], the configuration every generation run reads from.
//!
//! The configuration is built once, before scanning, and never changes afterwards. It is assembled from two
//! sources: the `GRUB_*` keys of `/etc/default/grub` (see [`defaults`]) and the `org.zedenv.grub:*` properties of
//! the boot environment root (see [`properties`]).

use std::path::PathBuf;

use thiserror::Error;

use crate::{config::properties::ZedenvProperties, entry::BootEnvironment};

pub mod builder;
pub mod defaults;
pub mod properties;

/// The classes given to every Linux entry, after the distributor class.
const LINUX_CLASSES: &str = "--class gnu-linux --class gnu --class os";

/// Errors indicating that the configuration is invalid.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A property was set to a value outside of what it accepts.
    #[error("Property \"{property}\" is set to invalid value \"{value}\", should be one of {expected}")]
    InvalidValue {
        /// The name of the property.
        property: String,

        /// The value that was found.
        value: String,

        /// The values that would have been accepted.
        expected: &'static str,
    },

    /// A value that has no default was not provided.
    #[error("Required value \"{0}\" is missing")]
    Missing(&'static str),
}

/// The configuration of a generation run.
#[derive(Clone, Debug)]
pub struct GrubConfig {
    /// The distributor name from `GRUB_DISTRIBUTOR`, if one was set.
    pub distributor: Option<String>,

    /// Kernel arguments for every entry, from `GRUB_CMDLINE_LINUX`.
    pub cmdline_linux: String,

    /// Kernel arguments for non-recovery entries, from `GRUB_CMDLINE_LINUX_DEFAULT`.
    pub cmdline_linux_default: String,

    /// Puts every entry at the top level instead of in a submenu.
    pub disable_submenu: bool,

    /// Skips the recovery entry of every kernel.
    pub disable_recovery: bool,

    /// Whether `root=PARTUUID=` is avoided. Every root here is a ZFS dataset, so this is informational.
    pub disable_linux_partuuid: bool,

    /// An explicit `gfxpayload` for every entry, from `GRUB_GFXPAYLOAD_LINUX`.
    pub gfxpayload_linux: Option<String>,

    /// Distribution provided microcode images, from `GRUB_EARLY_INITRD_LINUX_STOCK`.
    pub early_initrd_stock: Vec<String>,

    /// User provided early images, from `GRUB_EARLY_INITRD_LINUX_CUSTOM`.
    pub early_initrd_custom: Vec<String>,

    /// Emits `savedefault` in every entry, from `GRUB_SAVEDEFAULT`.
    pub save_default: bool,

    /// The default entry title as `grub-mkconfig` resolved it, from `GRUB_ACTUAL_DEFAULT`.
    pub actual_default: Option<String>,

    /// Emits `cryptomount` lines for encrypted devices, from `GRUB_ENABLE_CRYPTODISK`.
    pub enable_cryptodisk: bool,

    /// The zedenv plugin properties.
    pub properties: ZedenvProperties,

    /// The dataset that holds every boot environment, such as `rpool/ROOT`.
    pub be_root: String,

    /// The dataset mounted at `/`, used for kernels that do not belong to a boot environment.
    pub root_dataset: String,

    /// The activated boot environment, which is the pool's `bootfs`. Its kernels come first in the menu.
    pub active_dataset: Option<String>,

    /// The running system's `/boot`, scanned after the boot environment tree when `/boot` is on ZFS.
    pub running_boot: Option<PathBuf>,

    /// The devices holding `/`.
    pub root_devices: Vec<String>,

    /// The devices holding the boot directory.
    pub boot_devices: Vec<String>,
}

impl GrubConfig {
    /// The operating system name used in titles, such as `Debian GNU/Linux`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn os(&self) -> String {
        match &self.distributor {
            Some(distributor) => format!("{distributor} GNU/Linux"),
            None => "GNU/Linux".to_owned(),
        }
    }

    /// The `--class` arguments of every entry.
    #[must_use = "Has no effect if the result is unused"]
    pub fn class(&self) -> String {
        match &self.distributor {
            Some(distributor) => format!("--class {} {LINUX_CLASSES}", normalize_string(distributor)),
            None => LINUX_CLASSES.to_owned(),
        }
    }

    /// The devices GRUB has to reach in order to read kernels.
    ///
    /// When `/boot` lives on ZFS the kernels are read straight from the root pool, otherwise from the boot device.
    #[must_use = "Has no effect if the result is unused"]
    pub fn access_devices(&self) -> &[String] {
        if self.properties.boot_on_zfs {
            &self.root_devices
        } else {
            &self.boot_devices
        }
    }

    /// The dataset whose kernels come first, falling back to the root dataset when no boot environment was
    /// activated explicitly.
    #[must_use = "Has no effect if the result is unused"]
    pub fn active_boot_environment(&self) -> &str {
        self.active_dataset.as_deref().unwrap_or(&self.root_dataset)
    }

    /// The dataset a kernel boots into, which doubles as the entry's device id.
    #[must_use = "Has no effect if the result is unused"]
    pub fn dataset_for<'a>(&'a self, boot_environment: Option<&'a BootEnvironment>) -> &'a str {
        boot_environment.map_or(&self.root_dataset, |be| &be.dataset)
    }
}

/// Given a string, keeps only the lowercased alphanumerics of every space separated word, then joins the words
/// with underscores.
///
/// `Arch Linux` becomes `arch_linux`, which is how the distributor turns into a menu class.
#[must_use = "Has no effect if the result is unused"]
pub fn normalize_string(input: &str) -> String {
    input
        .split(' ')
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::builder::GrubConfigBuilder;

    #[test]
    fn test_normalize_string() {
        assert_eq!(normalize_string("Arch Linux"), "arch_linux");
        assert_eq!(normalize_string("Void"), "void");
        assert_eq!(normalize_string("Foo-Bar (Test)"), "foobar_test");
    }

    #[test]
    fn test_os_and_class() -> Result<(), ConfigError> {
        let config = GrubConfigBuilder::new("rpool/ROOT")
            .defaults([("GRUB_DISTRIBUTOR", "Arch Linux")])
            .build()?;
        assert_eq!(config.os(), "Arch Linux GNU/Linux");
        assert_eq!(
            config.class(),
            "--class arch_linux --class gnu-linux --class gnu --class os"
        );

        let config = GrubConfigBuilder::new("rpool/ROOT").build()?;
        assert_eq!(config.os(), "GNU/Linux");
        assert_eq!(config.class(), LINUX_CLASSES);
        Ok(())
    }

    #[test]
    fn test_dataset_for() -> Result<(), ConfigError> {
        let config = GrubConfigBuilder::new("rpool/ROOT")
            .root_dataset("rpool/ROOT/current")
            .build()?;
        let be = BootEnvironment::new("rpool/ROOT", "default");
        assert_eq!(config.dataset_for(Some(&be)), "rpool/ROOT/default");
        assert_eq!(config.dataset_for(None), "rpool/ROOT/current");
        Ok(())
    }

    #[test]
    fn test_active_boot_environment() -> Result<(), ConfigError> {
        let config = GrubConfigBuilder::new("rpool/ROOT")
            .root_dataset("rpool/ROOT/current")
            .build()?;
        assert_eq!(config.active_boot_environment(), "rpool/ROOT/current");

        let config = GrubConfigBuilder::new("rpool/ROOT")
            .root_dataset("rpool/ROOT/current")
            .active_dataset("rpool/ROOT/next")
            .build()?;
        assert_eq!(config.active_boot_environment(), "rpool/ROOT/next");
        Ok(())
    }
}
