// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Loads the `GRUB_*` keys from `/etc/default/grub` and the environment.
//!
//! `grub-mkconfig` sources `/etc/default/grub` as a shell script and exports the result to every script in
//! `/etc/grub.d`. This module does not run a shell. It understands the subset of shell that defaults files are
//! written in, and lets exported environment variables win over the file, so values that `grub-mkconfig` computed
//! (such as `GRUB_ACTUAL_DEFAULT`) are picked up when running under it.
//!
//! Example file:
//!
//! ```text
//! # comments and blank lines are skipped
//! GRUB_DISTRIBUTOR="Void"
//! GRUB_CMDLINE_LINUX_DEFAULT='quiet'
//! export GRUB_DISABLE_SUBMENU=y
//! GRUB_CMDLINE_LINUX_DEFAULT="$GRUB_CMDLINE_LINUX_DEFAULT splash"
//! ```

use std::collections::HashMap;

use log::debug;

/// The `GRUB_*` keys that the generator reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrubKey {
    /// `GRUB_DISTRIBUTOR`
    Distributor,

    /// `GRUB_DISABLE_LINUX_PARTUUID`
    DisableLinuxPartuuid,

    /// `GRUB_CMDLINE_LINUX`
    CmdlineLinux,

    /// `GRUB_CMDLINE_LINUX_DEFAULT`
    CmdlineLinuxDefault,

    /// `GRUB_DISABLE_SUBMENU`
    DisableSubmenu,

    /// `GRUB_DISABLE_RECOVERY`
    DisableRecovery,

    /// `GRUB_GFXPAYLOAD_LINUX`
    GfxpayloadLinux,

    /// `GRUB_EARLY_INITRD_LINUX_STOCK`
    EarlyInitrdLinuxStock,

    /// `GRUB_EARLY_INITRD_LINUX_CUSTOM`
    EarlyInitrdLinuxCustom,

    /// `GRUB_SAVEDEFAULT`
    SaveDefault,

    /// `GRUB_ACTUAL_DEFAULT`
    ActualDefault,

    /// `GRUB_ENABLE_CRYPTODISK`
    EnableCryptodisk,
}

impl GrubKey {
    /// Every recognized key.
    pub const ALL: [Self; 12] = [
        Self::Distributor,
        Self::DisableLinuxPartuuid,
        Self::CmdlineLinux,
        Self::CmdlineLinuxDefault,
        Self::DisableSubmenu,
        Self::DisableRecovery,
        Self::GfxpayloadLinux,
        Self::EarlyInitrdLinuxStock,
        Self::EarlyInitrdLinuxCustom,
        Self::SaveDefault,
        Self::ActualDefault,
        Self::EnableCryptodisk,
    ];

    /// Convert a [`GrubKey`] into its variable name.
    #[must_use = "Has no effect if the result is unused"]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Distributor => "GRUB_DISTRIBUTOR",
            Self::DisableLinuxPartuuid => "GRUB_DISABLE_LINUX_PARTUUID",
            Self::CmdlineLinux => "GRUB_CMDLINE_LINUX",
            Self::CmdlineLinuxDefault => "GRUB_CMDLINE_LINUX_DEFAULT",
            Self::DisableSubmenu => "GRUB_DISABLE_SUBMENU",
            Self::DisableRecovery => "GRUB_DISABLE_RECOVERY",
            Self::GfxpayloadLinux => "GRUB_GFXPAYLOAD_LINUX",
            Self::EarlyInitrdLinuxStock => "GRUB_EARLY_INITRD_LINUX_STOCK",
            Self::EarlyInitrdLinuxCustom => "GRUB_EARLY_INITRD_LINUX_CUSTOM",
            Self::SaveDefault => "GRUB_SAVEDEFAULT",
            Self::ActualDefault => "GRUB_ACTUAL_DEFAULT",
            Self::EnableCryptodisk => "GRUB_ENABLE_CRYPTODISK",
        }
    }

    /// Looks up a key by its variable name.
    #[must_use = "Has no effect if the result is unused"]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

/// Parses the contents of a defaults file into ordered key value pairs.
///
/// Every `KEY=VALUE` assignment is returned in file order, with quotes removed and `$VAR` / `${VAR}` references
/// to earlier assignments expanded. Anything that is not an assignment (comments, conditionals, function calls) is
/// skipped, and so are assignments that need a command substitution. Single quoted values are taken literally.
#[must_use = "Has no effect if the result is unused"]
pub fn parse_defaults(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut seen: HashMap<String, String> = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").map_or(line, str::trim_start);
        let Some((key, raw)) = line.split_once('=') else {
            continue;
        };
        if !is_identifier(key) {
            continue;
        }
        if raw.contains('`') || raw.contains("$(") {
            debug!("Skipping {key}, command substitution is not evaluated");
            continue;
        }

        let value = parse_value(raw, &seen);
        seen.insert(key.to_owned(), value.clone());
        pairs.push((key.to_owned(), value));
    }

    pairs
}

/// Overlays environment variables on parsed pairs.
///
/// Only recognized `GRUB_*` keys are taken from the environment, and they are appended after the file's pairs so
/// they take priority when applied in order.
#[must_use = "Has no effect if the result is unused"]
pub fn overlay_environment<I>(mut pairs: Vec<(String, String)>, env: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (String, String)>,
{
    pairs.extend(
        env.into_iter()
            .filter(|(key, _)| GrubKey::from_name(key).is_some()),
    );
    pairs
}

/// Checks that a key is a valid shell variable name.
fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parses the right hand side of an assignment.
///
/// Quoted and unquoted runs may be concatenated (`a"b c"'d'`). An unquoted space ends the value, and anything
/// after it (usually a comment) is dropped.
fn parse_value(raw: &str, seen: &HashMap<String, String>) -> String {
    let mut value = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                    value.push(c);
                }
            }
            '"' => {
                let mut quoted = String::new();
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                quoted.push(escaped);
                            }
                        }
                        c => quoted.push(c),
                    }
                }
                value.push_str(&expand(&quoted, seen));
            }
            c if c.is_whitespace() => break,
            c => {
                let mut bare = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || next == '\'' || next == '"' {
                        break;
                    }
                    bare.push(next);
                    chars.next();
                }
                value.push_str(&expand(&bare, seen));
            }
        }
    }

    value
}

/// Expands `$VAR` and `${VAR}` using earlier assignments. Unknown variables expand to nothing, like in a shell.
fn expand(text: &str, seen: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, remainder) = if let Some(braced) = after.strip_prefix('{') {
            match braced.split_once('}') {
                Some((name, remainder)) => (name, remainder),
                None => ("", after),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], &after[end..])
        };

        if name.is_empty() {
            out.push('$');
        } else if let Some(value) = seen.get(name) {
            out.push_str(value);
        }
        rest = remainder;
    }

    out.push_str(rest);
    out
}
