// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`Generator`], which turns the boot environment tree into a GRUB menu.
//!
//! Generation is a single pass. The scanner lists every kernel, each kernel is turned into a [`KernelImage`], and
//! [`build_menu`] walks the kernels in order while tracking whether the submenu has been opened yet. The submenu
//! is opened at most once, on the first kernel, and closed once after the last.

use log::{debug, info};

use crate::{
    GrubResult,
    config::GrubConfig,
    entry::{
        EntryType, KernelImage,
        device::prepare_device_access,
        render::{EntryRenderer, GrubEntry, submenu_line, title_correction},
    },
    error::GrubError,
    scan::{BootDirectory, Scanner, genkernel_arch},
    system::command::GrubTools,
};

/// One item of the generated menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MenuItem {
    /// A `menuentry` stanza.
    Entry(GrubEntry),

    /// The line that opens the submenu.
    SubmenuOpen(String),

    /// The brace that closes the submenu.
    SubmenuClose,
}

/// The generated menu, in output order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Menu {
    /// The stanzas and submenu delimiters.
    pub items: Vec<MenuItem>,

    /// Snippets that fix up a saved default which moved into the submenu, printed after every item.
    pub title_corrections: Vec<String>,
}

impl Menu {
    /// Checks if the menu has no entries.
    #[must_use = "Has no effect if the result is unused"]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Flattens the menu into the lines of the config stream.
    #[must_use = "Has no effect if the result is unused"]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for item in &self.items {
            match item {
                MenuItem::Entry(entry) => lines.extend(entry.lines.iter().cloned()),
                MenuItem::SubmenuOpen(line) => lines.push(line.clone()),
                MenuItem::SubmenuClose => lines.push("}".to_owned()),
            }
        }
        lines.extend(self.title_corrections.iter().cloned());
        lines
    }
}

/// Where the next entries go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MenuState {
    /// Nothing has been nested yet.
    TopLevel,

    /// The submenu is open. It stays open until the end of the menu.
    InSubmenu,
}

/// The GRUB menu generator.
pub struct Generator<'a, T: GrubTools + ?Sized> {
    /// The configuration of the run.
    config: &'a GrubConfig,

    /// The GRUB userland tools.
    tools: &'a T,

    /// The scanner for the machine and layout.
    scanner: Scanner,

    /// The genkernel architecture tag of the machine.
    arch_hint: String,
}

impl<'a, T: GrubTools + ?Sized> Generator<'a, T> {
    /// Creates a [`Generator`] for a machine string such as `x86_64`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(config: &'a GrubConfig, tools: &'a T, machine: &str) -> Self {
        Self {
            config,
            tools,
            scanner: Scanner::new(machine, config.properties.layout()),
            arch_hint: genkernel_arch(machine).to_owned(),
        }
    }

    /// Finds every kernel in the boot environment tree, followed by the running `/boot` when it is on ZFS.
    ///
    /// The kernels of the active boot environment are then moved to the front, so that the simple entry boots it.
    /// Every other kernel keeps its place relative to the rest.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the boot directory or a boot environment directory does not exist, or if
    /// `grub-mkrelpath` fails for any directory holding kernels. Nothing is returned in that case.
    pub fn collect(&self) -> GrubResult<Vec<KernelImage>> {
        let boot = &self.config.properties.boot;
        if !boot.is_dir() {
            return Err(GrubError::NotFound(boot.clone()));
        }

        let mut directories = self.scanner.list_be_kernels(&self.config.properties.env_tree())?;

        if self.config.properties.boot_on_zfs
            && let Some(running_boot) = &self.config.running_boot
        {
            if running_boot.is_dir() {
                directories.push(
                    self.scanner
                        .scan_directory(running_boot.display().to_string(), running_boot.clone())?,
                );
            } else {
                debug!("{} does not exist, skipping", running_boot.display());
            }
        }

        let mut kernels = Vec::new();
        for directory in &directories {
            self.collect_directory(directory, &mut kernels)?;
        }

        let active = self.config.active_boot_environment();
        kernels.sort_by_key(|kernel| self.config.dataset_for(kernel.boot_environment.as_ref()) != active);
        Ok(kernels)
    }

    /// Collects the kernels of the boot environment tree and renders them.
    ///
    /// # Errors
    ///
    /// May return an `Error` for the same reasons as [`Self::collect`].
    pub fn generate(&self) -> GrubResult<Menu> {
        let kernels = self.collect()?;
        if kernels.is_empty() {
            info!("No kernels found in {}", self.config.properties.env_tree().display());
            return Ok(Menu::default());
        }

        let device_access = prepare_device_access(
            self.tools,
            self.config.access_devices(),
            self.config.enable_cryptodisk,
        );
        let renderer = EntryRenderer::new(self.config, &device_access);
        Ok(build_menu(self.config, &renderer, &kernels))
    }

    /// Turns the kernels of one directory into [`KernelImage`]s.
    fn collect_directory(&self, directory: &BootDirectory, kernels: &mut Vec<KernelImage>) -> GrubResult<()> {
        if directory.kernels.is_empty() {
            debug!("No kernels in {}", directory.directory.display());
            return Ok(());
        }

        let rel_directory = self.tools.mkrelpath(&directory.directory)?;
        for path in directory.kernel_paths() {
            info!("Found linux image: {}", path.display());
            let kernel = KernelImage::new(path, rel_directory.clone(), self.config, &self.arch_hint);

            if !kernel.initrd.is_empty() {
                let initrds: Vec<_> = kernel
                    .initrd
                    .names()
                    .map(|name| directory.directory.join(name).display().to_string())
                    .collect();
                info!("Found initrd image: {}", initrds.join(" "));
            }

            kernels.push(kernel);
        }
        Ok(())
    }
}

/// Lays out the entries of every kernel, in order.
///
/// The first kernel gets the simple entry, followed by the submenu that holds the advanced and recovery entries of
/// every kernel. With the submenu disabled, every advanced and recovery entry stays at the top level and there is
/// no simple entry.
#[must_use = "Has no effect if the result is unused"]
pub fn build_menu(config: &GrubConfig, renderer: &EntryRenderer<'_>, kernels: &[KernelImage]) -> Menu {
    let mut menu = Menu::default();
    let mut state = MenuState::TopLevel;

    let entry_types: &[EntryType] = if config.disable_recovery {
        &[EntryType::Advanced]
    } else {
        &[EntryType::Advanced, EntryType::Recovery]
    };

    for kernel in kernels {
        if state == MenuState::TopLevel && !config.disable_submenu {
            if config.properties.simple_entries {
                menu.items
                    .push(MenuItem::Entry(renderer.render(kernel, EntryType::Simple, 0)));
            }

            let device_id = config.dataset_for(kernel.boot_environment.as_ref());
            menu.items
                .push(MenuItem::SubmenuOpen(submenu_line(config, device_id)));
            state = MenuState::InSubmenu;
        }

        let indent = match state {
            MenuState::TopLevel => 0,
            MenuState::InSubmenu => 1,
        };

        for &entry_type in entry_types {
            let entry = renderer.render(kernel, entry_type, indent);
            if state == MenuState::InSubmenu
                && let Some(correction) = title_correction(config, &entry.title)
            {
                menu.title_corrections.push(correction);
            }
            menu.items.push(MenuItem::Entry(entry));
        }
    }

    if state == MenuState::InSubmenu {
        menu.items.push(MenuItem::SubmenuClose);
    }

    menu
}
