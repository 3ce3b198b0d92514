// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The boot inventory scanner.
//!
//! This finds the kernel images that get menu entries. It can either scan a single directory the way `10_linux`
//! scans `/boot` ([`Scanner::list_candidates`]), or walk a boot environment tree where every `zedenv-<name>`
//! directory holds the kernels of one boot environment ([`Scanner::list_be_kernels`]).
//!
//! Which names count as kernels depends on the machine: `vmlinuz-*` and `kernel-*` always do, while `vmlinux-*`
//! (an uncompressed image) is only offered on machines that are not x86.

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use log::debug;
use regex::Regex;

use crate::{
    GrubResult,
    config::properties::BootLayout,
    system::fs::{is_valid, read_dir_sorted},
};

pub mod order;

/// Kernel name prefixes accepted on every machine.
const KERNEL_PREFIXES: [&str; 2] = ["vmlinuz-", "kernel-"];

/// Kernel name prefix accepted only on machines that are not x86.
const VMLINUX_PREFIX: &str = "vmlinux-";

/// The prefix of every boot environment directory.
pub const BE_DIR_PREFIX: &str = "zedenv-";

/// 32 bit x86 machine names.
static IA32: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"i[3-6]86").unwrap_or_else(|_| unreachable!("IA-32 regex should always compile"))
});

/// Every x86 machine name.
static X86: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"i[3-6]86|x86_64").unwrap_or_else(|_| unreachable!("x86 regex should always compile"))
});

/// Checks whether a machine string is x86, anywhere in the string.
#[must_use = "Has no effect if the result is unused"]
pub fn is_x86(machine: &str) -> bool {
    X86.is_match(machine)
}

/// Checks whether a machine string is 32 bit x86, anywhere in the string.
fn is_ia32(machine: &str) -> bool {
    IA32.is_match(machine)
}

/// Maps a machine string to the architecture tag used by genkernel initrd names.
///
/// `i386` through `i686` become `x86`, the little endian MIPS variants become `mipsel`, the other MIPS variants
/// become `mips`, and anything containing `arm` becomes `arm`. Every other machine string, including `x86_64`, is
/// returned unchanged.
#[must_use = "Has no effect if the result is unused"]
pub fn genkernel_arch(machine: &str) -> &str {
    if is_ia32(machine) {
        "x86"
    } else if machine.contains("mipsel") || machine.contains("mips64el") {
        "mipsel"
    } else if machine.contains("mips") {
        "mips"
    } else if machine.contains("arm") {
        "arm"
    } else {
        machine
    }
}

/// Decides which file names are kernel images on a given machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelMatcher {
    /// Whether `vmlinux-*` is accepted.
    allow_vmlinux: bool,
}

impl KernelMatcher {
    /// Creates a [`KernelMatcher`] for a machine string.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(machine: &str) -> Self {
        Self {
            allow_vmlinux: !is_x86(machine),
        }
    }

    /// Checks whether a file name is a kernel image.
    #[must_use = "Has no effect if the result is unused"]
    pub fn is_kernel_name(self, name: &str) -> bool {
        KERNEL_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
            || (self.allow_vmlinux && name.starts_with(VMLINUX_PREFIX))
    }
}

/// The contents of one directory that kernels were searched in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootDirectory {
    /// The name of the entry in the boot environment tree, such as `zedenv-default`.
    pub name: String,

    /// The directory the kernels are in.
    pub directory: PathBuf,

    /// Every file name in the directory.
    pub files: Vec<String>,

    /// The kernel file names, newest first.
    pub kernels: Vec<String>,
}

impl BootDirectory {
    /// The full paths of the kernels, newest first.
    pub fn kernel_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.kernels.iter().map(|kernel| self.directory.join(kernel))
    }
}

/// The boot inventory scanner.
#[derive(Clone, Copy, Debug)]
pub struct Scanner {
    /// The kernel name matcher for the machine.
    matcher: KernelMatcher,

    /// The boot environment layout.
    layout: BootLayout,
}

impl Scanner {
    /// Creates a [`Scanner`] for a machine string and a boot environment layout.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(machine: &str, layout: BootLayout) -> Self {
        Self {
            matcher: KernelMatcher::new(machine),
            layout,
        }
    }

    /// Lists the kernel images directly inside `root`, newest first.
    ///
    /// # Errors
    ///
    /// May return an `Error` if `root` does not exist or could not be read.
    pub fn list_candidates(&self, root: &Path) -> GrubResult<Vec<PathBuf>> {
        let directory = self.scan_directory(root.display().to_string(), root.to_path_buf())?;
        Ok(directory.kernel_paths().collect())
    }

    /// Lists the kernels of every boot environment in a boot environment tree.
    ///
    /// Every `zedenv-<name>` directory of `tree` is a boot environment, visited in name order. In the `zfsenv`
    /// layout the kernels are in the `boot` subdirectory of each. Anything else inside `tree` is skipped.
    ///
    /// # Errors
    ///
    /// May return an `Error` if `tree` or a boot environment's kernel directory does not exist, or could not be
    /// read.
    pub fn list_be_kernels(&self, tree: &Path) -> GrubResult<Vec<BootDirectory>> {
        let mut directories = Vec::new();

        for name in read_dir_sorted(tree)? {
            let be_dir = tree.join(&name);
            if !be_dir.is_dir() {
                debug!("Skipping {}, not a directory", be_dir.display());
                continue;
            }
            if !name.starts_with(BE_DIR_PREFIX) {
                debug!("Skipping {}, not a boot environment", be_dir.display());
                continue;
            }

            let directory = match self.layout.kernel_subdir() {
                Some(subdir) => be_dir.join(subdir),
                None => be_dir,
            };
            directories.push(self.scan_directory(name, directory)?);
        }

        Ok(directories)
    }

    /// Lists a single directory, keeping the valid kernel images.
    ///
    /// # Errors
    ///
    /// May return an `Error` if `directory` does not exist or could not be read.
    pub fn scan_directory(&self, name: String, directory: PathBuf) -> GrubResult<BootDirectory> {
        let files = read_dir_sorted(&directory)?;
        let mut kernels: Vec<String> = files
            .iter()
            .filter(|file| self.matcher.is_kernel_name(file) && is_valid(&directory.join(file)))
            .cloned()
            .collect();
        order::sort_newest_first(&mut kernels);

        debug!(
            "{}: {} files, kernels {kernels:?}",
            directory.display(),
            files.len()
        );

        Ok(BootDirectory {
            name,
            directory,
            files,
            kernels,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use proptest::prelude::*;
    use tempfile::TempDir;

    use super::*;
    use crate::error::GrubError;

    fn touch(dir: &Path, name: &str) {
        fs::create_dir_all(dir).expect("Failed to create dir in test");
        fs::write(dir.join(name), b"").expect("Failed to create file in test");
    }

    #[test]
    fn test_genkernel_arch() {
        assert_eq!(genkernel_arch("i386"), "x86");
        assert_eq!(genkernel_arch("i686"), "x86");
        assert_eq!(genkernel_arch("x86_64"), "x86_64");
        assert_eq!(genkernel_arch("mips"), "mips");
        assert_eq!(genkernel_arch("mips64"), "mips");
        assert_eq!(genkernel_arch("mipsel"), "mipsel");
        assert_eq!(genkernel_arch("mips64el"), "mipsel");
        assert_eq!(genkernel_arch("armv7l"), "arm");
        assert_eq!(genkernel_arch("aarch64"), "aarch64");
        assert_eq!(genkernel_arch("ppc64le"), "ppc64le");
    }

    #[test]
    fn test_is_x86() {
        for machine in ["i386", "i486", "i586", "i686", "x86_64", "pc-i686-linux", "linux-x86_64-v3"] {
            assert!(is_x86(machine), "{machine}");
        }
        assert!(is_ia32("pc-i586"));
        assert!(!is_ia32("x86_64"));
        for machine in ["i286", "i786", "aarch64", "riscv64", "x86", "ppc64le"] {
            assert!(!is_x86(machine), "{machine}");
        }
    }

    #[test]
    fn test_kernel_names() {
        let x86 = KernelMatcher::new("x86_64");
        assert!(x86.is_kernel_name("vmlinuz-6.1.0"));
        assert!(x86.is_kernel_name("kernel-genkernel-x86_64-6.1.0"));
        assert!(!x86.is_kernel_name("vmlinux-6.1.0"));
        assert!(!x86.is_kernel_name("initrd.img-6.1.0"));
        assert!(!x86.is_kernel_name("config-vmlinuz-6.1.0"));

        let arm = KernelMatcher::new("aarch64");
        assert!(arm.is_kernel_name("vmlinux-6.1.0"));
        assert!(arm.is_kernel_name("vmlinuz-6.1.0"));
    }

    #[test]
    fn test_list_candidates() -> GrubResult<()> {
        let dir = TempDir::new().expect("Failed to create tempdir");
        for name in [
            "vmlinuz-5.10.0-1",
            "vmlinuz-6.1.0-9",
            "vmlinuz-6.1.0-9.dpkg",
            "vmlinux-6.1.0-9",
            "initrd.img-6.1.0-9",
            "README.vmlinuz",
        ] {
            touch(dir.path(), name);
        }

        let scanner = Scanner::new("x86_64", BootLayout::Env);
        let candidates = scanner.list_candidates(dir.path())?;
        assert_eq!(
            candidates,
            [
                dir.path().join("vmlinuz-6.1.0-9"),
                dir.path().join("vmlinuz-5.10.0-1")
            ]
        );

        let scanner = Scanner::new("riscv64", BootLayout::Env);
        assert_eq!(scanner.list_candidates(dir.path())?.len(), 3);
        Ok(())
    }

    #[test]
    fn test_list_candidates_missing_root() {
        let dir = TempDir::new().expect("Failed to create tempdir");
        let scanner = Scanner::new("x86_64", BootLayout::Env);
        let missing = dir.path().join("boot");
        assert!(matches!(
            scanner.list_candidates(&missing),
            Err(GrubError::NotFound(path)) if path == missing
        ));
    }

    #[test]
    fn test_list_be_kernels_env_layout() -> GrubResult<()> {
        let dir = TempDir::new().expect("Failed to create tempdir");
        let tree = dir.path().join("env");
        touch(&tree.join("zedenv-b"), "vmlinuz-6.1.0");
        touch(&tree.join("zedenv-a"), "vmlinuz-5.10.0");
        touch(&tree.join("zedenv-a"), "initrd.img-5.10.0");
        touch(&tree, "stray-file");
        touch(&tree.join("lost+found"), "vmlinuz-4.0.0");

        let scanner = Scanner::new("x86_64", BootLayout::Env);
        let dirs = scanner.list_be_kernels(&tree)?;
        assert_eq!(dirs.len(), 2);
        assert_eq!(dirs[0].name, "zedenv-a");
        assert_eq!(dirs[0].directory, tree.join("zedenv-a"));
        assert_eq!(dirs[0].files, ["initrd.img-5.10.0", "vmlinuz-5.10.0"]);
        assert_eq!(dirs[0].kernels, ["vmlinuz-5.10.0"]);
        assert_eq!(dirs[1].name, "zedenv-b");
        assert_eq!(dirs[1].kernels, ["vmlinuz-6.1.0"]);
        Ok(())
    }

    #[test]
    fn test_list_be_kernels_zfsenv_layout() -> GrubResult<()> {
        let dir = TempDir::new().expect("Failed to create tempdir");
        let tree = dir.path().join("zfsenv");
        touch(&tree.join("zedenv-default").join("boot"), "vmlinuz-6.1.0");

        let scanner = Scanner::new("x86_64", BootLayout::ZfsEnv);
        let dirs = scanner.list_be_kernels(&tree)?;
        assert_eq!(dirs[0].directory, tree.join("zedenv-default").join("boot"));
        assert_eq!(dirs[0].kernels, ["vmlinuz-6.1.0"]);

        fs::create_dir_all(tree.join("zedenv-empty")).expect("Failed to create dir in test");
        assert!(matches!(
            scanner.list_be_kernels(&tree),
            Err(GrubError::NotFound(path)) if path == tree.join("zedenv-empty").join("boot")
        ));
        Ok(())
    }

    proptest! {
        #[test]
        fn x86_never_offers_vmlinux(
            machine in prop::sample::select(vec!["i386", "i486", "i586", "i686", "x86_64"]),
            suffix in "[a-z0-9._-]{0,16}",
        ) {
            let name = format!("vmlinux-{suffix}");
            prop_assert!(!KernelMatcher::new(machine).is_kernel_name(&name));
        }

        #[test]
        fn other_machines_offer_vmlinux(machine in "[a-z][a-z0-9_]{0,10}", suffix in "[a-z0-9._-]{0,16}") {
            prop_assume!(!is_x86(&machine));
            let name = format!("vmlinux-{suffix}");
            prop_assert!(KernelMatcher::new(&machine).is_kernel_name(&name));
        }

        #[test]
        fn genkernel_arch_is_total(machine in ".*") {
            let arch = genkernel_arch(&machine);
            prop_assert!(["x86", "mips", "mipsel", "arm", machine.as_str()].contains(&arch));
            if machine.contains("mipsel") || machine.contains("mips64el") {
                prop_assert_eq!(arch, if is_ia32(&machine) { "x86" } else { "mipsel" });
            }
        }
    }
}
