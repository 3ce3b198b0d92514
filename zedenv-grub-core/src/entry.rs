// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`KernelImage`], everything the entry builder knows about one kernel.
//!
//! A kernel's version, boot environment, initrds and graphics hint are all derived from its path and the files
//! next to it. The derivations are independent of each other and of every other kernel, which keeps rendering
//! ([`render`]) a pure function of a [`KernelImage`] and the configuration.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use log::warn;
use regex::Regex;

use crate::{
    config::GrubConfig,
    entry::initrd::InitrdSet,
    system::fs::first_existing_path,
};

pub mod device;
pub mod initrd;
pub mod render;

/// The version of a kernel file name: everything after a leading run free of digits and dashes.
static LINUX_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^0-9\-]*-(.*)$")
        .unwrap_or_else(|_| unreachable!("Linux version regex should always compile"))
});

/// The boot environment of a kernel directory, in either the `env` or the `zfsenv` layout.
static BE_DIRECTORY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"zedenv-([^/]+?)(?:/boot)?/*$")
        .unwrap_or_else(|_| unreachable!("Boot environment regex should always compile"))
});

/// The boot environment of a relativized `/boot`, such as `/ROOT/default@/boot`.
static BE_RELPATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*/([^/@]+)@/boot/*$")
        .unwrap_or_else(|_| unreachable!("Boot environment relpath regex should always compile"))
});

/// Where genkernel installs kernel configs.
const GENKERNEL_CONFIG_DIR: &str = "/etc/kernels";

/// Kernel config lines that, together, make `gfxpayload=keep` safe.
const KEEP_GFXPAYLOAD_OPTIONS: [&str; 2] = ["CONFIG_FB_EFI=y", "CONFIG_VT_HW_CONSOLE_BINDING=y"];

/// The kind of menu entry being rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryType {
    /// The top level entry without a version in its title.
    Simple,

    /// The normal entry for one kernel.
    Advanced,

    /// The single user entry for one kernel.
    Recovery,
}

impl EntryType {
    /// Convert an [`EntryType`] into the string used in menu entry ids.
    #[must_use = "Has no effect if the result is unused"]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Advanced => "advanced",
            Self::Recovery => "recovery",
        }
    }
}

/// A boot environment, identified by its name and its root dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootEnvironment {
    /// The name of the boot environment, such as `default`.
    pub name: String,

    /// The root dataset of the boot environment, such as `rpool/ROOT/default`.
    pub dataset: String,
}

impl BootEnvironment {
    /// Creates a [`BootEnvironment`] under a boot environment root dataset.
    pub fn new(be_root: &str, name: impl Into<String>) -> Self {
        let name = name.into();
        let dataset = format!("{}/{name}", be_root.trim_end_matches('/'));
        Self { name, dataset }
    }
}

/// One bootable kernel file and everything derived from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelImage {
    /// The absolute path of the kernel file.
    pub path: PathBuf,

    /// The file name of the kernel.
    pub basename: String,

    /// The directory of the kernel, as GRUB sees it.
    pub rel_directory: String,

    /// The kernel version, or an empty string if the name carries none.
    pub version: String,

    /// The boot environment the kernel belongs to, if the directory follows the `zedenv-<name>` convention.
    pub boot_environment: Option<BootEnvironment>,

    /// The genkernel architecture tag of the machine.
    pub arch_hint: String,

    /// The initrds loaded with the kernel.
    pub initrd: InitrdSet,

    /// Whether the kernel config allows keeping the firmware framebuffer.
    pub keep_gfxpayload: bool,
}

impl KernelImage {
    /// Derives a [`KernelImage`] from a kernel path.
    ///
    /// `rel_directory` is the kernel's directory as returned by `grub-mkrelpath`. It is used for every path written
    /// into the entry, and as a fallback for finding the boot environment of a kernel in the running `/boot`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(path: PathBuf, rel_directory: String, config: &GrubConfig, arch_hint: &str) -> Self {
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let basename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let version = linux_version(&basename);

        let boot_environment = boot_environment_name(&directory)
            .or_else(|| boot_environment_from_relpath(&rel_directory))
            .map(|name| BootEnvironment::new(&config.be_root, name));

        let initrd = InitrdSet::new(&directory, &version, arch_hint, config);
        let keep_gfxpayload = kernel_config_path(&directory, &version)
            .is_some_and(|kernel_config| keeps_gfxpayload(&kernel_config));

        Self {
            path,
            basename,
            rel_directory,
            version,
            boot_environment,
            arch_hint: arch_hint.to_owned(),
            initrd,
            keep_gfxpayload,
        }
    }

    /// The path of a file next to the kernel, as GRUB sees it.
    #[must_use = "Has no effect if the result is unused"]
    pub fn rel_path(&self, name: &str) -> String {
        format!("{}/{name}", self.rel_directory.trim_end_matches('/'))
    }
}

/// Extracts the version from a kernel file name.
///
/// The version is everything after the first `-`, provided nothing before that dash is a digit. `vmlinuz-5.10.0-1`
/// gives `5.10.0-1` and `kernel-genkernel-x86-4.9` gives `genkernel-x86-4.9`. A name that does not fit gives an
/// empty string, which is not an error.
#[must_use = "Has no effect if the result is unused"]
pub fn linux_version(basename: &str) -> String {
    LINUX_VERSION
        .captures(basename)
        .and_then(|captures| captures.get(1))
        .map(|version| version.as_str().to_owned())
        .unwrap_or_default()
}

/// Finds the boot environment name of a kernel directory from its trailing `zedenv-<name>` component.
///
/// Both `.../zedenv-<name>` and `.../zedenv-<name>/boot` are recognized.
#[must_use = "Has no effect if the result is unused"]
pub fn boot_environment_name(directory: &Path) -> Option<String> {
    let directory = directory.to_string_lossy();
    BE_DIRECTORY
        .captures(&directory)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().to_owned())
}

/// Finds the boot environment name of a relativized `/boot`, such as `default` in `/ROOT/default@/boot`.
#[must_use = "Has no effect if the result is unused"]
pub fn boot_environment_from_relpath(rel_directory: &str) -> Option<String> {
    BE_RELPATH
        .captures(rel_directory)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().to_owned())
}

/// Finds the config of a kernel version, either next to the kernel or where genkernel puts it.
#[must_use = "Has no effect if the result is unused"]
pub fn kernel_config_path(directory: &Path, version: &str) -> Option<PathBuf> {
    first_existing_path([
        directory.join(format!("config-{version}")),
        Path::new(GENKERNEL_CONFIG_DIR).join(format!("kernel-config-{version}")),
    ])
}

/// Checks a kernel config for both the EFI framebuffer and console binding options.
///
/// An unreadable config is treated as having neither.
#[must_use = "Has no effect if the result is unused"]
pub fn keeps_gfxpayload(kernel_config: &Path) -> bool {
    match fs::read_to_string(kernel_config) {
        Ok(content) => KEEP_GFXPAYLOAD_OPTIONS
            .iter()
            .all(|option| content.lines().any(|line| line.trim_end() == *option)),
        Err(e) => {
            warn!("Could not read kernel config {}: {e}", kernel_config.display());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use tempfile::TempDir;

    use super::*;
    use crate::config::builder::GrubConfigBuilder;

    #[test]
    fn test_linux_version() {
        assert_eq!(linux_version("vmlinuz-5.10.0-1"), "5.10.0-1");
        assert_eq!(linux_version("vmlinuz-4.16.12_1"), "4.16.12_1");
        assert_eq!(linux_version("vmlinuz-linux"), "linux");
        assert_eq!(linux_version("kernel-genkernel-x86-4.9.6"), "genkernel-x86-4.9.6");
        assert_eq!(linux_version("vmlinuz"), "");
        assert_eq!(linux_version("vmlinuz2-5.1"), "");
    }

    #[test]
    fn test_boot_environment_name() {
        assert_eq!(
            boot_environment_name(Path::new("/mnt/boot/env/zedenv-default")),
            Some("default".to_owned())
        );
        assert_eq!(
            boot_environment_name(Path::new("/mnt/boot/zfsenv/zedenv-default/boot")),
            Some("default".to_owned())
        );
        assert_eq!(
            boot_environment_name(Path::new("/mnt/boot/env/zedenv-with-dashes/")),
            Some("with-dashes".to_owned())
        );
        assert_eq!(boot_environment_name(Path::new("/boot")), None);
    }

    #[test]
    fn test_boot_environment_from_relpath() {
        assert_eq!(
            boot_environment_from_relpath("/ROOT/default@/boot"),
            Some("default".to_owned())
        );
        assert_eq!(boot_environment_from_relpath("/boot"), None);
    }

    #[test]
    fn test_boot_environment_dataset() {
        let be = BootEnvironment::new("rpool/ROOT/", "default");
        assert_eq!(be.dataset, "rpool/ROOT/default");
    }

    #[test]
    fn test_kernel_image() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let be_dir = dir.path().join("env").join("zedenv-default");
        fs::create_dir_all(&be_dir)?;
        fs::write(be_dir.join("vmlinuz-5.10.0-1"), b"")?;
        fs::write(be_dir.join("initrd.img-5.10.0-1"), b"")?;
        fs::write(
            be_dir.join("config-5.10.0-1"),
            "CONFIG_FB_EFI=y\nCONFIG_VT_HW_CONSOLE_BINDING=y\n",
        )?;

        let config = GrubConfigBuilder::new("rpool/ROOT").build()?;
        let kernel = KernelImage::new(
            be_dir.join("vmlinuz-5.10.0-1"),
            "/env/zedenv-default".to_owned(),
            &config,
            "x86_64",
        );

        assert_eq!(kernel.version, "5.10.0-1");
        assert_eq!(kernel.basename, "vmlinuz-5.10.0-1");
        assert_eq!(
            kernel.boot_environment,
            Some(BootEnvironment::new("rpool/ROOT", "default"))
        );
        assert_eq!(
            kernel.boot_environment.as_ref().map(|be| be.dataset.as_str()),
            Some("rpool/ROOT/default")
        );
        assert_eq!(kernel.initrd.real.as_deref(), Some("initrd.img-5.10.0-1"));
        assert!(kernel.keep_gfxpayload);
        assert_eq!(
            kernel.rel_path(&kernel.basename),
            "/env/zedenv-default/vmlinuz-5.10.0-1"
        );
        Ok(())
    }

    #[test]
    fn test_keeps_gfxpayload_needs_both() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let only_fb = dir.path().join("config-a");
        fs::write(&only_fb, "CONFIG_FB_EFI=y\n# CONFIG_VT_HW_CONSOLE_BINDING is not set\n")?;
        assert!(!keeps_gfxpayload(&only_fb));
        assert!(!keeps_gfxpayload(&dir.path().join("missing")));
        Ok(())
    }

    #[test]
    fn test_kernel_config_path() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        assert_eq!(kernel_config_path(dir.path(), "zedenv-test-none"), None);
        fs::write(dir.path().join("config-6.1.0"), b"")?;
        assert_eq!(
            kernel_config_path(dir.path(), "6.1.0"),
            Some(dir.path().join("config-6.1.0"))
        );
        Ok(())
    }

    proptest! {
        #[test]
        fn version_doesnt_panic(x in any::<String>()) {
            let _ = linux_version(&x);
        }

        #[test]
        fn version_after_prefix(prefix in "[a-z]{1,8}", version in "[0-9][0-9a-z._-]{0,16}") {
            let name = format!("{prefix}-{version}");
            prop_assert_eq!(linux_version(&name), version);
        }
    }
}
