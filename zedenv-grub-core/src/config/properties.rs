// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The `org.zedenv.grub:*` properties of the boot environment root.
//!
//! These are ZFS user properties, read by an external tool and handed over as key value pairs. Both the bare name
//! (`bootonzfs`) and the full property name (`org.zedenv.grub:bootonzfs`) are accepted. A value of `-` is how ZFS
//! prints an unset property, so it leaves the default in place.

use std::path::{Path, PathBuf};

use log::warn;

use crate::config::ConfigError;

/// The namespace of every plugin property.
pub const PROPERTY_PREFIX: &str = "org.zedenv.grub:";

/// The name of the generated configuration file inside the GRUB directory.
const GRUB_CFG: &str = "grub.cfg";

/// Where boot environment kernels are kept inside the boot directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootLayout {
    /// Kernels are copied into `<boot>/env/zedenv-<name>`, with `/boot` on a separate filesystem.
    Env,

    /// Every boot environment is mounted at `<boot>/zfsenv/zedenv-<name>`, and its kernels are in its own `/boot`.
    ZfsEnv,
}

impl BootLayout {
    /// The directory name of the layout inside the boot directory.
    #[must_use = "Has no effect if the result is unused"]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Env => "env",
            Self::ZfsEnv => "zfsenv",
        }
    }

    /// The subdirectory of a boot environment directory that holds its kernels, if there is one.
    #[must_use = "Has no effect if the result is unused"]
    pub fn kernel_subdir(self) -> Option<&'static str> {
        match self {
            Self::Env => None,
            Self::ZfsEnv => Some("boot"),
        }
    }
}

/// The plugin properties, with the plugin's defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZedenvProperties {
    /// Where boot environment kernels are kept or mounted.
    pub boot: PathBuf,

    /// Whether `/boot` lives on ZFS inside every boot environment.
    pub boot_on_zfs: bool,

    /// The name of the GRUB directory under `/boot`.
    pub grub_subdir: String,

    /// Whether a simple entry is put in front of the submenu.
    pub simple_entries: bool,
}

impl Default for ZedenvProperties {
    fn default() -> Self {
        Self {
            boot: PathBuf::from("/mnt/boot"),
            boot_on_zfs: true,
            grub_subdir: "grub".to_owned(),
            simple_entries: true,
        }
    }
}

impl ZedenvProperties {
    /// Builds the properties from key value pairs, starting from the defaults.
    ///
    /// # Errors
    ///
    /// May return an `Error` if `bootonzfs` is set to anything other than `yes`, `no`, `1` or `0`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut properties = Self::default();

        for (key, value) in pairs {
            let key = key.as_ref();
            let value = value.as_ref().trim();
            if value == "-" {
                continue;
            }

            match key.strip_prefix(PROPERTY_PREFIX).unwrap_or(key) {
                "boot" => properties.boot = PathBuf::from(value),
                "bootonzfs" => properties.boot_on_zfs = parse_switch("bootonzfs", value)?,
                "grubsubdir" => properties.grub_subdir = value.to_owned(),
                "simpleentries" => {
                    properties.simple_entries =
                        !matches!(&*value.to_ascii_lowercase(), "n" | "no" | "0");
                }
                _ => warn!("Ignoring unknown property {key}"),
            }
        }

        Ok(properties)
    }

    /// The layout selected by `bootonzfs`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn layout(&self) -> BootLayout {
        if self.boot_on_zfs {
            BootLayout::ZfsEnv
        } else {
            BootLayout::Env
        }
    }

    /// The directory holding every `zedenv-<name>` directory.
    #[must_use = "Has no effect if the result is unused"]
    pub fn env_tree(&self) -> PathBuf {
        self.boot.join(self.layout().dir_name())
    }

    /// The path of `grub.cfg`, given where `/boot` is mounted.
    #[must_use = "Has no effect if the result is unused"]
    pub fn grub_cfg_path(&self, boot_mountpoint: &Path) -> PathBuf {
        boot_mountpoint.join(&self.grub_subdir).join(GRUB_CFG)
    }
}

/// Parses a strict yes/no property.
///
/// # Errors
///
/// May return an `Error` if the value is not one of `yes`, `no`, `1`, or `0`, in any case.
pub fn parse_switch(property: &str, value: &str) -> Result<bool, ConfigError> {
    match &*value.to_ascii_lowercase() {
        "yes" | "1" => Ok(true),
        "no" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            property: property.to_owned(),
            value: value.to_owned(),
            expected: "'yes', 'no', '0', or '1'",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() -> Result<(), ConfigError> {
        let properties = ZedenvProperties::from_pairs(Vec::<(&str, &str)>::new())?;
        assert_eq!(properties, ZedenvProperties::default());
        assert_eq!(properties.layout(), BootLayout::ZfsEnv);
        assert_eq!(properties.env_tree(), PathBuf::from("/mnt/boot/zfsenv"));
        assert_eq!(
            properties.grub_cfg_path(Path::new("/boot")),
            PathBuf::from("/boot/grub/grub.cfg")
        );
        Ok(())
    }

    #[test]
    fn test_full_properties() -> Result<(), ConfigError> {
        let properties = ZedenvProperties::from_pairs([
            ("org.zedenv.grub:boot", "/boot"),
            ("org.zedenv.grub:bootonzfs", "no"),
            ("grubsubdir", "grub2"),
            ("simpleentries", "No"),
        ])?;
        assert_eq!(properties.boot, PathBuf::from("/boot"));
        assert!(!properties.boot_on_zfs);
        assert_eq!(properties.grub_subdir, "grub2");
        assert!(!properties.simple_entries);
        assert_eq!(properties.layout(), BootLayout::Env);
        assert_eq!(properties.env_tree(), PathBuf::from("/boot/env"));
        Ok(())
    }

    #[test]
    fn test_bootonzfs_values() -> Result<(), ConfigError> {
        for (value, expected) in [("yes", true), ("1", true), ("YES", true), ("no", false), ("0", false)] {
            let properties = ZedenvProperties::from_pairs([("bootonzfs", value)])?;
            assert_eq!(properties.boot_on_zfs, expected, "bootonzfs={value}");
        }
        Ok(())
    }

    #[test]
    fn test_bootonzfs_invalid() {
        let result = ZedenvProperties::from_pairs([("bootonzfs", "maybe")]);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { property, value, .. }) if property == "bootonzfs" && value == "maybe"
        ));
    }

    #[test]
    fn test_unset_property_keeps_default() -> Result<(), ConfigError> {
        let properties = ZedenvProperties::from_pairs([("org.zedenv.grub:boot", "-")])?;
        assert_eq!(properties.boot, PathBuf::from("/mnt/boot"));
        Ok(())
    }

    #[test]
    fn test_layout_kernel_subdir() {
        assert_eq!(BootLayout::Env.kernel_subdir(), None);
        assert_eq!(BootLayout::ZfsEnv.kernel_subdir(), Some("boot"));
    }
}
