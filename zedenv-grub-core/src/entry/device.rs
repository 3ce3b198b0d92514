// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The lines that let GRUB reach the device holding the kernels.
//!
//! Every line comes from a `grub-probe` query. A failing query is never fatal: it is logged and its lines are left
//! out, since GRUB can often still find the device on its own.

use log::warn;

use crate::system::command::{CommandError, GrubTools, ProbeTarget};

/// Builds the `insmod`, `cryptomount`, `set root` and `search` lines for a set of devices.
///
/// The lines are shared by every entry of a run, so this is called once.
pub fn prepare_device_access<T: GrubTools + ?Sized>(
    tools: &T,
    devices: &[String],
    enable_cryptodisk: bool,
) -> Vec<String> {
    if devices.is_empty() {
        warn!("No devices to probe, entries will rely on GRUB's own root");
        return Vec::new();
    }

    let probe = |target: ProbeTarget| non_empty(probe_or_warn(tools.probe(devices, target), target));
    let mut lines = Vec::new();

    for module in probe(ProbeTarget::Abstraction) {
        lines.push(format!("insmod {module}"));
    }
    for module in probe(ProbeTarget::Fs) {
        lines.push(format!("insmod {module}"));
    }

    if enable_cryptodisk {
        for uuid in probe(ProbeTarget::CryptodiskUuid) {
            lines.push(format!("cryptomount -u {uuid}"));
        }
    }

    let hint = probe(ProbeTarget::CompatibilityHint).concat();
    if !hint.is_empty() {
        lines.push(format!("set root='{hint}'"));
    }

    if let Some(fs_uuid) = probe(ProbeTarget::FsUuid).into_iter().next() {
        let hints = probe(ProbeTarget::HintsString).concat();
        let hinted = if hints.is_empty() {
            fs_uuid.clone()
        } else {
            format!("{hints} {fs_uuid}")
        };

        lines.extend([
            "if [ x$feature_platform_search_hint = xy ]; then".to_owned(),
            format!("  search --no-floppy --fs-uuid --set=root {hinted}"),
            "else".to_owned(),
            format!("  search --no-floppy --fs-uuid --set=root {fs_uuid}"),
            "fi".to_owned(),
        ]);
    }

    lines
}

/// Unwraps a probe result, logging and discarding a failure.
fn probe_or_warn(result: Result<Vec<String>, CommandError>, target: ProbeTarget) -> Vec<String> {
    result.unwrap_or_else(|e| {
        warn!("grub-probe --target={target} failed: {e}");
        Vec::new()
    })
}

/// Trims every line, dropping the blank ones.
fn non_empty(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .map(|line| line.trim().to_owned())
        .filter(|line| !line.is_empty())
        .collect()
}
