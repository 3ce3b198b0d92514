// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Configuration builder.

use std::path::PathBuf;

use log::debug;

use crate::config::{ConfigError, GrubConfig, defaults::GrubKey, properties::ZedenvProperties};

/// A builder to configure a [`GrubConfig`]
///
/// # Example
///
/// ```
/// use zedenv_grub_core::config::builder::GrubConfigBuilder;
///
/// let config = GrubConfigBuilder::new("rpool/ROOT")
///     .root_dataset("rpool/ROOT/default")
///     .defaults([("GRUB_DISTRIBUTOR", "Debian"), ("GRUB_DISABLE_RECOVERY", "true")])
///     .build()
///     .expect("be_root is set");
///
/// assert_eq!(config.os(), "Debian GNU/Linux");
/// assert!(config.disable_recovery);
/// ```
#[must_use = "Has no effect if the result is unused"]
pub struct GrubConfigBuilder {
    /// The inner [`GrubConfig`] that the builder operates on.
    config: GrubConfig,
}

impl GrubConfigBuilder {
    /// Constructs a new [`GrubConfig`] with every `GRUB_*` value unset.
    ///
    /// The root dataset starts out as the boot environment root itself.
    pub fn new(be_root: impl Into<String>) -> Self {
        let be_root = be_root.into().trim_end_matches('/').to_owned();
        Self {
            config: GrubConfig {
                distributor: None,
                cmdline_linux: String::new(),
                cmdline_linux_default: String::new(),
                disable_submenu: false,
                disable_recovery: false,
                disable_linux_partuuid: true,
                gfxpayload_linux: None,
                early_initrd_stock: Vec::new(),
                early_initrd_custom: Vec::new(),
                save_default: false,
                actual_default: None,
                enable_cryptodisk: false,
                properties: ZedenvProperties::default(),
                root_dataset: be_root.clone(),
                active_dataset: None,
                be_root,
                running_boot: None,
                root_devices: Vec::new(),
                boot_devices: Vec::new(),
            },
        }
    }

    /// Sets the dataset mounted at `/`.
    pub fn root_dataset(mut self, root_dataset: impl Into<String>) -> Self {
        self.config.root_dataset = root_dataset.into();
        self
    }

    /// Sets the activated boot environment dataset, such as the pool's `bootfs`.
    pub fn active_dataset(mut self, active_dataset: impl Into<String>) -> Self {
        self.config.active_dataset = Some(active_dataset.into().trim_end_matches('/').to_owned());
        self
    }

    /// Applies `GRUB_*` key value pairs, in order. Later pairs override earlier ones.
    ///
    /// Keys that are not recognized are ignored.
    pub fn defaults<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match GrubKey::from_name(key) {
                Some(key) => self.apply(key, value),
                None => debug!("Ignoring unrecognized key {key}"),
            }
        }
        self
    }

    /// Sets the zedenv plugin properties.
    pub fn properties(mut self, properties: ZedenvProperties) -> Self {
        self.config.properties = properties;
        self
    }

    /// Sets the running system's `/boot`, which is only scanned when `/boot` is on ZFS.
    pub fn running_boot(mut self, running_boot: impl Into<PathBuf>) -> Self {
        self.config.running_boot = Some(running_boot.into());
        self
    }

    /// Sets the devices holding `/`.
    pub fn root_devices(mut self, devices: Vec<String>) -> Self {
        self.config.root_devices = devices;
        self
    }

    /// Sets the devices holding the boot directory.
    pub fn boot_devices(mut self, devices: Vec<String>) -> Self {
        self.config.boot_devices = devices;
        self
    }

    /// Assigns a value to a field in a [`GrubConfig`] if it is [`Some`].
    pub fn assign_if_some<F, T>(self, value: Option<T>, assign: F) -> Self
    where
        F: FnOnce(Self, T) -> Self,
    {
        if let Some(value) = value {
            assign(self, value)
        } else {
            self
        }
    }

    /// Builds a [`GrubConfig`]
    ///
    /// # Errors
    ///
    /// May return an `Error` if the boot environment root dataset is empty.
    pub fn build(self) -> Result<GrubConfig, ConfigError> {
        if self.config.be_root.is_empty() {
            return Err(ConfigError::Missing("be_root"));
        }
        if self.config.root_dataset.is_empty() {
            return Err(ConfigError::Missing("root_dataset"));
        }
        Ok(self.config)
    }

    /// Assigns one recognized `GRUB_*` value.
    ///
    /// The comparisons follow `10_linux`: anything other than the exact enabling value leaves a toggle off.
    fn apply(&mut self, key: GrubKey, value: &str) {
        let config = &mut self.config;
        let non_empty = || (!value.is_empty()).then(|| value.to_owned());
        match key {
            GrubKey::Distributor => config.distributor = non_empty(),
            GrubKey::DisableLinuxPartuuid => {
                config.disable_linux_partuuid = !matches!(value, "false" | "False" | "0");
            }
            GrubKey::CmdlineLinux => config.cmdline_linux = value.to_owned(),
            GrubKey::CmdlineLinuxDefault => config.cmdline_linux_default = value.to_owned(),
            GrubKey::DisableSubmenu => config.disable_submenu = matches!(value, "y" | "true"),
            GrubKey::DisableRecovery => config.disable_recovery = value == "true",
            GrubKey::GfxpayloadLinux => config.gfxpayload_linux = non_empty(),
            GrubKey::EarlyInitrdLinuxStock => config.early_initrd_stock = split_words(value),
            GrubKey::EarlyInitrdLinuxCustom => config.early_initrd_custom = split_words(value),
            GrubKey::SaveDefault => config.save_default = value == "true",
            GrubKey::ActualDefault => config.actual_default = non_empty(),
            GrubKey::EnableCryptodisk => config.enable_cryptodisk = value == "y",
        }
    }
}

/// Splits a whitespace separated list into owned words.
fn split_words(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_defaults() -> Result<(), ConfigError> {
        let config = GrubConfigBuilder::new("rpool/ROOT/")
            .defaults([
                ("GRUB_DISTRIBUTOR", "Void"),
                ("GRUB_CMDLINE_LINUX", "zfs.zfs_arc_max=1073741824"),
                ("GRUB_CMDLINE_LINUX_DEFAULT", "quiet splash"),
                ("GRUB_DISABLE_SUBMENU", "y"),
                ("GRUB_DISABLE_RECOVERY", "true"),
                ("GRUB_DISABLE_LINUX_PARTUUID", "false"),
                ("GRUB_GFXPAYLOAD_LINUX", "1024x768"),
                ("GRUB_EARLY_INITRD_LINUX_STOCK", "intel-ucode.img  amd-ucode.img"),
                ("GRUB_EARLY_INITRD_LINUX_CUSTOM", "custom.img"),
                ("GRUB_SAVEDEFAULT", "true"),
                ("GRUB_ACTUAL_DEFAULT", "0"),
                ("GRUB_ENABLE_CRYPTODISK", "y"),
            ])
            .build()?;

        assert_eq!(config.be_root, "rpool/ROOT");
        assert_eq!(config.distributor.as_deref(), Some("Void"));
        assert_eq!(config.cmdline_linux, "zfs.zfs_arc_max=1073741824");
        assert_eq!(config.cmdline_linux_default, "quiet splash");
        assert!(config.disable_submenu);
        assert!(config.disable_recovery);
        assert!(!config.disable_linux_partuuid);
        assert_eq!(config.gfxpayload_linux.as_deref(), Some("1024x768"));
        assert_eq!(config.early_initrd_stock, ["intel-ucode.img", "amd-ucode.img"]);
        assert_eq!(config.early_initrd_custom, ["custom.img"]);
        assert!(config.save_default);
        assert_eq!(config.actual_default.as_deref(), Some("0"));
        assert!(config.enable_cryptodisk);
        Ok(())
    }

    #[test]
    fn test_toggles_need_exact_values() -> Result<(), ConfigError> {
        let config = GrubConfigBuilder::new("rpool/ROOT")
            .defaults([
                ("GRUB_DISABLE_SUBMENU", "yes"),
                ("GRUB_DISABLE_RECOVERY", "y"),
                ("GRUB_SAVEDEFAULT", "1"),
                ("GRUB_DISABLE_LINUX_PARTUUID", "no"),
            ])
            .build()?;
        assert!(!config.disable_submenu);
        assert!(!config.disable_recovery);
        assert!(!config.save_default);
        assert!(config.disable_linux_partuuid);
        Ok(())
    }

    #[test]
    fn test_empty_distributor_is_unset() -> Result<(), ConfigError> {
        let config = GrubConfigBuilder::new("rpool/ROOT")
            .defaults([("GRUB_DISTRIBUTOR", "")])
            .build()?;
        assert_eq!(config.distributor, None);
        Ok(())
    }

    #[test]
    fn test_unknown_keys_ignored() -> Result<(), ConfigError> {
        let config = GrubConfigBuilder::new("rpool/ROOT")
            .defaults([("GRUB_TIMEOUT", "5"), ("PATH", "/usr/bin")])
            .build()?;
        assert_eq!(config.distributor, None);
        Ok(())
    }

    #[test]
    fn test_missing_be_root() {
        assert!(matches!(
            GrubConfigBuilder::new("").build(),
            Err(ConfigError::Missing("be_root"))
        ));
    }

    #[test]
    fn test_assign_if_some() -> Result<(), ConfigError> {
        let config = GrubConfigBuilder::new("rpool/ROOT")
            .assign_if_some(Some("rpool/ROOT/other"), GrubConfigBuilder::root_dataset)
            .assign_if_some(None::<&str>, GrubConfigBuilder::running_boot)
            .build()?;
        assert_eq!(config.root_dataset, "rpool/ROOT/other");
        assert_eq!(config.running_boot, None);
        Ok(())
    }
}
