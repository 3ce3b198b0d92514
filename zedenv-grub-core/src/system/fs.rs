// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Filesystem helper functions for other modules.
//!
//! Everything here is read only. The scanner and the entry builder only ever list directories and test whether
//! files exist, so these wrap [`std::fs`] with the exact checks that `grub-mkconfig_lib` performs.

use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use log::warn;

use crate::{GrubResult, error::GrubError};

/// Extensions left behind by package managers. Files ending in these are never kernels or initrds.
const GARBAGE_EXTENSIONS: [&str; 5] = ["dpkg", "rpmsave", "rpmnew", "pacsave", "pacnew"];

/// Name fragments of documentation files, compared in lowercase.
const GARBAGE_NAMES: [&str; 1] = ["readme"];

/// Checks that a path is a regular file that is not packaging or documentation leftovers.
///
/// This is the equivalent of `grub_file_is_not_garbage` from `grub-mkconfig_lib`. A file is rejected if it is not
/// a regular file, if its extension is one of `.dpkg`, `.rpmsave`, `.rpmnew`, `.pacsave` or `.pacnew`, or if its
/// file name contains `readme` in any case.
#[must_use = "Has no effect if the result is unused"]
pub fn is_valid(path: &Path) -> bool {
    path.is_file() && is_not_garbage_name(path)
}

/// The name-only half of [`is_valid`], which does not touch the filesystem.
#[must_use = "Has no effect if the result is unused"]
pub fn is_not_garbage_name(path: &Path) -> bool {
    if path
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| GARBAGE_EXTENSIONS.contains(&ext))
    {
        return false;
    }

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    !GARBAGE_NAMES.iter().any(|garbage| name.contains(garbage))
}

/// Lists the names inside a directory, sorted by their bytes.
///
/// Directory listing order is not stable between filesystems, so sorting here is what keeps two runs over the same
/// tree byte-identical. Names that are not valid UTF-8 cannot appear in a GRUB config line and are skipped.
///
/// # Errors
///
/// May return an `Error` if the directory does not exist, or it could not be read.
pub fn read_dir_sorted(dir: &Path) -> GrubResult<Vec<String>> {
    if !dir.is_dir() {
        return Err(GrubError::NotFound(dir.to_path_buf()));
    }

    let io_err = |source| GrubError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let name = entry.map_err(io_err)?.file_name();
        match name.into_string() {
            Ok(name) => names.push(name),
            Err(name) => warn!("Skipping non UTF-8 file name {}", name.to_string_lossy()),
        }
    }

    names.sort_unstable();
    Ok(names)
}

/// Returns the first candidate name that is a regular file inside `dir`.
#[must_use = "Has no effect if the result is unused"]
pub fn first_existing_file<I, S>(dir: &Path, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    candidates
        .into_iter()
        .map(Into::into)
        .find(|name| dir.join(name).is_file())
}

/// Returns the first candidate path that is a regular file.
#[must_use = "Has no effect if the result is unused"]
pub fn first_existing_path(candidates: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    candidates.into_iter().find(|path| path.is_file())
}
