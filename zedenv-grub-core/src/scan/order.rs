// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Ordering of kernels inside one directory.
//!
//! The newest kernel comes first, so that the simple entry (which is generated from the first kernel) boots the
//! newest one. The version is the first run of dot separated numbers in the name that sits between dashes, such as
//! `6.1.0` in `vmlinuz-6.1.0-9-amd64`. A name that ends in its version, like `vmlinuz-6.1`, has no version. Kernels that carry a version rank above kernels that do not, and backups
//! (names ending in `bak` or `.old`) rank below everything else of the same version.

use std::{cmp::Ordering, sync::LazyLock};

use regex::Regex;

/// The version of a kernel file name.
static VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-([0-9]+(?:\.[0-9]+)*)-")
        .unwrap_or_else(|_| unreachable!("Kernel version regex should always compile"))
});

/// Suffixes of backup copies of kernels.
const BACKUP_SUFFIXES: [&str; 2] = ["bak", ".old"];

/// Extracts the numeric version components of a kernel file name, if it has any.
#[must_use = "Has no effect if the result is unused"]
pub fn version_key(name: &str) -> Option<Vec<u64>> {
    let version = VERSION.captures(name)?.get(1)?.as_str();
    Some(
        version
            .split('.')
            .map(|part| part.parse().unwrap_or(u64::MAX))
            .collect(),
    )
}

/// Checks whether a kernel file name is a backup copy.
fn is_backup(name: &str) -> bool {
    BACKUP_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Compares two kernel file names, with the newer kernel being greater.
#[must_use = "Has no effect if the result is unused"]
pub fn compare_kernels(a: &str, b: &str) -> Ordering {
    let backups = || is_backup(b).cmp(&is_backup(a));

    match (version_key(a), version_key(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb).then_with(backups),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => backups(),
    }
}

/// Sorts kernel file names newest first.
///
/// The sort is stable, so kernels that compare equal keep their directory order.
pub fn sort_newest_first(kernels: &mut [String]) {
    kernels.sort_by(|a, b| compare_kernels(b, a));
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn sorted(names: &[&str]) -> Vec<String> {
        let mut names: Vec<String> = names.iter().map(|name| (*name).to_owned()).collect();
        sort_newest_first(&mut names);
        names
    }

    #[test]
    fn test_version_key() {
        assert_eq!(version_key("vmlinuz-6.1.0-9-amd64"), Some(vec![6, 1, 0]));
        assert_eq!(version_key("vmlinuz-5.10.0-arch1-1"), Some(vec![5, 10, 0]));
        assert_eq!(version_key("vmlinuz-5.10.0"), None);
        assert_eq!(version_key("vmlinuz-linux"), None);
        assert_eq!(version_key("vmlinuz-linux-lts"), None);
    }

    #[test]
    fn test_numeric_ordering() {
        assert_eq!(
            sorted(&["vmlinuz-5.9.0-1", "vmlinuz-5.10.0-1", "vmlinuz-4.19.0-1"]),
            ["vmlinuz-5.10.0-1", "vmlinuz-5.9.0-1", "vmlinuz-4.19.0-1"]
        );
    }

    #[test]
    fn test_versioned_before_unversioned() {
        assert_eq!(
            sorted(&["vmlinuz-linux", "vmlinuz-6.1.0-1"]),
            ["vmlinuz-6.1.0-1", "vmlinuz-linux"]
        );
    }

    #[test]
    fn test_trailing_version_is_unversioned() {
        assert_eq!(
            sorted(&["vmlinuz-6.1", "vmlinuz-5.4-1"]),
            ["vmlinuz-5.4-1", "vmlinuz-6.1"]
        );
    }

    #[test]
    fn test_backups_last() {
        assert_eq!(
            sorted(&["vmlinuz-linux.old", "vmlinuz-linux", "vmlinuz-linux-lts"]),
            ["vmlinuz-linux", "vmlinuz-linux-lts", "vmlinuz-linux.old"]
        );
        assert_eq!(
            sorted(&["vmlinuz-6.1.0-1.bak", "vmlinuz-6.1.0-1"]),
            ["vmlinuz-6.1.0-1", "vmlinuz-6.1.0-1.bak"]
        );
    }

    proptest! {
        #[test]
        fn comparison_is_antisymmetric(a in "vmlinuz-[0-9.a-z-]{0,12}", b in "vmlinuz-[0-9.a-z-]{0,12}") {
            prop_assert_eq!(compare_kernels(&a, &b), compare_kernels(&b, &a).reverse());
        }

        #[test]
        fn version_key_doesnt_panic(x in any::<String>()) {
            let _ = version_key(&x);
        }
    }
}
