// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Renders a [`KernelImage`] into a GRUB `menuentry` stanza.

use crate::{
    config::GrubConfig,
    entry::{EntryType, KernelImage},
};

/// The prefix of every menu entry id produced here.
const ID_PREFIX: &str = "gnulinux";

/// One rendered menu stanza.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrubEntry {
    /// The kind of entry.
    pub entry_type: EntryType,

    /// The nesting level, 0 at the top level and 1 inside the submenu.
    pub indent: usize,

    /// The entry title, unquoted.
    pub title: String,

    /// The lines of the stanza, already indented.
    pub lines: Vec<String>,
}

/// Renders stanzas for one generation run.
#[derive(Clone, Copy, Debug)]
pub struct EntryRenderer<'a> {
    /// The configuration of the run.
    config: &'a GrubConfig,

    /// The device access lines shared by every entry.
    device_access: &'a [String],
}

impl<'a> EntryRenderer<'a> {
    /// Creates an [`EntryRenderer`] from a configuration and the lines returned by
    /// [`crate::entry::device::prepare_device_access`].
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(config: &'a GrubConfig, device_access: &'a [String]) -> Self {
        Self {
            config,
            device_access,
        }
    }

    /// Renders a kernel as a stanza of the given type, indented `indent` levels deep.
    #[must_use = "Has no effect if the result is unused"]
    pub fn render(&self, kernel: &KernelImage, entry_type: EntryType, indent: usize) -> GrubEntry {
        let config = self.config;
        let title = entry_title(config, kernel, entry_type);
        let device_id = config.dataset_for(kernel.boot_environment.as_ref());
        let id = match entry_type {
            EntryType::Simple => format!("{ID_PREFIX}-simple-{device_id}"),
            _ => format!(
                "{ID_PREFIX}-{}-{}-{device_id}",
                kernel.version,
                entry_type.as_str()
            ),
        };

        let mut body = Vec::new();
        if config.save_default {
            body.push("savedefault".to_owned());
        }

        body.push("load_video".to_owned());
        if let Some(gfxpayload) = &config.gfxpayload_linux {
            body.push(format!("set gfxpayload={gfxpayload}"));
        } else if kernel.keep_gfxpayload {
            body.push("set gfxpayload=keep".to_owned());
        }
        body.push("insmod gzio".to_owned());
        body.extend_from_slice(self.device_access);

        body.push(format!(
            "echo '{}'",
            grub_quote(&format!("Loading Linux {} ...", kernel.version))
        ));
        body.push(linux_line(config, kernel, entry_type, device_id));

        if !kernel.initrd.is_empty() {
            body.push(format!("echo '{}'", grub_quote("Loading initial ramdisk ...")));
            body.push(format!(
                "initrd {}",
                kernel.initrd.paths(&kernel.rel_directory).join(" ")
            ));
        }

        let mut lines = Vec::with_capacity(body.len() + 2);
        lines.push(indented(
            indent,
            &format!(
                "menuentry '{}' {} $menuentry_id_option '{id}' {{",
                grub_quote(&title),
                config.class()
            ),
        ));
        lines.extend(body.iter().map(|line| indented(indent + 1, line)));
        lines.push(indented(indent, "}"));

        GrubEntry {
            entry_type,
            indent,
            title,
            lines,
        }
    }
}

/// The title of an entry, unquoted.
#[must_use = "Has no effect if the result is unused"]
pub fn entry_title(config: &GrubConfig, kernel: &KernelImage, entry_type: EntryType) -> String {
    let os = config.os();
    match entry_type {
        EntryType::Simple => os,
        EntryType::Advanced => format!("{os} with Linux {}", kernel.version),
        EntryType::Recovery => format!("{os} with Linux {} (recovery mode)", kernel.version),
    }
}

/// The title of the submenu every advanced and recovery entry goes in.
#[must_use = "Has no effect if the result is unused"]
pub fn submenu_title(config: &GrubConfig) -> String {
    format!("Advanced options for {}", config.os())
}

/// The line that opens the submenu, with its id taken from the first kernel's dataset.
#[must_use = "Has no effect if the result is unused"]
pub fn submenu_line(config: &GrubConfig, device_id: &str) -> String {
    format!(
        "submenu '{}' $menuentry_id_option '{ID_PREFIX}-advanced-{device_id}' {{",
        grub_quote(&submenu_title(config))
    )
}

/// Builds the snippet that moves a saved default into the submenu, when `title` is the configured default.
///
/// `grub-mkconfig` resolves `GRUB_DEFAULT` to a title before the entries exist. Once the entry has moved into the
/// submenu, that title has to be rewritten to `<submenu>><title>` for GRUB to find it.
#[must_use = "Has no effect if the result is unused"]
pub fn title_correction(config: &GrubConfig, title: &str) -> Option<String> {
    let actual_default = config.actual_default.as_deref()?;
    let previous = format!("Previous Linux versions>{title}");
    if actual_default != title && actual_default != previous {
        return None;
    }

    let replacement = format!(
        "{}>{}",
        submenu_title(config).replace('>', ">>"),
        title.replace('>', ">>")
    );
    Some(format!(
        "if [ \"x$default\" = '{}' ]; then default='{}'; fi;",
        grub_quote(actual_default),
        grub_quote(&replacement)
    ))
}

/// Escapes a string to go inside GRUB single quotes.
#[must_use = "Has no effect if the result is unused"]
pub fn grub_quote(input: &str) -> String {
    input.replace('\'', r"'\''")
}

/// Builds the `linux` line.
fn linux_line(config: &GrubConfig, kernel: &KernelImage, entry_type: EntryType, device_id: &str) -> String {
    let root = format!("root=ZFS={device_id}");
    let kernel_path = kernel.rel_path(&kernel.basename);
    let mut parts = vec!["linux", kernel_path.as_str(), root.as_str(), "ro"];

    match entry_type {
        EntryType::Recovery => parts.extend(["single", config.cmdline_linux.as_str()]),
        EntryType::Simple | EntryType::Advanced => {
            parts.extend([config.cmdline_linux.as_str(), config.cmdline_linux_default.as_str()]);
        }
    }

    parts.retain(|part| !part.trim().is_empty());
    parts.join(" ")
}

/// Prefixes a line with `indent` tabs.
fn indented(indent: usize, line: &str) -> String {
    format!("{}{line}", "\t".repeat(indent))
}
