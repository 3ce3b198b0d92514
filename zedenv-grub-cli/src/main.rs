// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! A command line frontend to `zedenv-grub-core`.
//!
//! This is meant to be called from a `grub.d` script. The menu entries are written to stdout, where `grub-mkconfig`
//! picks them up, and every diagnostic goes to stderr.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use getargs::{Arg, Options};
use log::{LevelFilter, warn};
use zedenv_grub_core::{
    GrubResult,
    config::{
        ConfigError,
        builder::GrubConfigBuilder,
        defaults::{overlay_environment, parse_defaults},
        properties::ZedenvProperties,
    },
    error::GrubError,
    generator::Generator,
    system::{
        command::{self, GrubTools, SystemTools, grub_mkconfig},
        log_backend::StderrLogger,
    },
};

/// Where the `GRUB_*` defaults are read from when `--defaults` is not given.
const DEFAULTS_FILE: &str = "/etc/default/grub";

/// The running system's `/boot`.
const RUNNING_BOOT: &str = "/boot";

/// The help text.
const USAGE: &str = r"Usage: zedenv-grub [OPTIONS]

-h, --help                 display this help and exit
-v, --verbose              log more, may be repeated
-m, --machine MACHINE      the machine hardware name, instead of `uname -m`
-b, --be-root DATASET      the dataset holding every boot environment, such as rpool/ROOT
-r, --root-dataset DATASET the dataset mounted at /
-a, --active DATASET       the activated boot environment (the pool's bootfs), instead of the root dataset
-d, --defaults FILE        read GRUB_* values from FILE instead of /etc/default/grub
-p, --property KEY=VALUE   set an org.zedenv.grub property, may be repeated
    --running-boot DIR     the running system's /boot
-u, --update               run grub-mkconfig to write grub.cfg and exit
-o, --output FILE          the grub.cfg written by --update, instead of /boot/<grubsubdir>/grub.cfg
";

/// The parsed command line.
#[derive(Default)]
struct CliArgs {
    /// How many times `-v` was given.
    verbosity: u8,

    /// The machine hardware name.
    machine: Option<String>,

    /// The boot environment root dataset.
    be_root: Option<String>,

    /// The dataset mounted at `/`.
    root_dataset: Option<String>,

    /// The activated boot environment dataset.
    active: Option<String>,

    /// The defaults file.
    defaults: Option<PathBuf>,

    /// Properties as key value pairs.
    properties: Vec<(String, String)>,

    /// The running system's `/boot`.
    running_boot: Option<PathBuf>,

    /// Whether to run `grub-mkconfig` instead of generating entries.
    update: bool,

    /// The `grub.cfg` written by `--update`.
    output: Option<PathBuf>,
}

/// The outcome of parsing the command line.
enum Parsed {
    /// Run with these arguments.
    Run(CliArgs),

    /// Print the usage and exit successfully.
    Help,

    /// The command line was invalid, the message has already been printed.
    Invalid,
}

/// Parses the command line arguments, not including the program name.
fn parse_args<'a>(args: impl Iterator<Item = &'a str>) -> Parsed {
    let mut cli = CliArgs::default();
    let mut opts = Options::new(args);

    loop {
        let arg = match opts.next_arg() {
            Ok(Some(arg)) => arg,
            Ok(None) => return Parsed::Run(cli),
            Err(e) => {
                eprintln!("Error: {e}");
                return Parsed::Invalid;
            }
        };

        let takes_value = !matches!(
            arg,
            Arg::Short('h' | 'v' | 'u') | Arg::Long("help" | "verbose" | "update") | Arg::Positional(_)
        );
        let value = if takes_value {
            match opts.value() {
                Ok(value) => Some(value),
                Err(_) => {
                    eprintln!("Error: {} needs a value", describe_arg(arg));
                    return Parsed::Invalid;
                }
            }
        } else {
            None
        };

        match (arg, value) {
            (Arg::Short('h') | Arg::Long("help"), _) => return Parsed::Help,
            (Arg::Short('v') | Arg::Long("verbose"), _) => cli.verbosity = cli.verbosity.saturating_add(1),
            (Arg::Short('m') | Arg::Long("machine"), Some(value)) => cli.machine = Some(value.to_owned()),
            (Arg::Short('b') | Arg::Long("be-root"), Some(value)) => cli.be_root = Some(value.to_owned()),
            (Arg::Short('r') | Arg::Long("root-dataset"), Some(value)) => {
                cli.root_dataset = Some(value.to_owned());
            }
            (Arg::Short('a') | Arg::Long("active"), Some(value)) => cli.active = Some(value.to_owned()),
            (Arg::Short('d') | Arg::Long("defaults"), Some(value)) => cli.defaults = Some(PathBuf::from(value)),
            (Arg::Short('p') | Arg::Long("property"), Some(value)) => {
                let Some((key, value)) = value.split_once('=') else {
                    eprintln!("Error: Property \"{value}\" is not in the form KEY=VALUE");
                    return Parsed::Invalid;
                };
                cli.properties.push((key.to_owned(), value.to_owned()));
            }
            (Arg::Long("running-boot"), Some(value)) => cli.running_boot = Some(PathBuf::from(value)),
            (Arg::Short('u') | Arg::Long("update"), _) => cli.update = true,
            (Arg::Short('o') | Arg::Long("output"), Some(value)) => cli.output = Some(PathBuf::from(value)),
            (Arg::Short(invalid), _) => {
                eprintln!("Error: Unknown short argument: -{invalid}");
                return Parsed::Invalid;
            }
            (Arg::Long(invalid), _) => {
                eprintln!("Error: Unknown long argument: --{invalid}");
                return Parsed::Invalid;
            }
            (Arg::Positional(invalid), _) => {
                eprintln!("Error: Unknown positional argument: {invalid}");
                return Parsed::Invalid;
            }
        }
    }
}

/// Renders an argument the way it was written.
fn describe_arg(arg: Arg<&str>) -> String {
    match arg {
        Arg::Short(flag) => format!("-{flag}"),
        Arg::Long(flag) => format!("--{flag}"),
        Arg::Positional(positional) => positional.to_owned(),
    }
}

/// Maps the number of `-v` flags to a log level.
fn log_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Reads and parses the defaults file, then lays the process environment over it.
///
/// A missing file is not an error, since every value has a default.
fn load_defaults(path: &Path) -> GrubResult<Vec<(String, String)>> {
    let pairs = match fs::read_to_string(path) {
        Ok(content) => parse_defaults(&content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("{} does not exist, using built in defaults", path.display());
            Vec::new()
        }
        Err(source) => {
            return Err(GrubError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    Ok(overlay_environment(pairs, std::env::vars()))
}

/// The parent of a dataset, such as `rpool/ROOT` for `rpool/ROOT/default`.
fn parent_dataset(dataset: &str) -> Option<&str> {
    dataset.rsplit_once('/').map(|(parent, _)| parent)
}

/// Generates the menu and writes it to stdout.
fn generate(cli: CliArgs) -> GrubResult<()> {
    let tools = SystemTools;
    let properties = ZedenvProperties::from_pairs(cli.properties)?;

    let root_dataset = cli.root_dataset;
    let be_root = cli
        .be_root
        .or_else(|| root_dataset.as_deref().and_then(parent_dataset).map(str::to_owned))
        .unwrap_or_default();
    if be_root.is_empty() {
        return Err(ConfigError::Missing("be_root").into());
    }

    let root_devices = tools.probe_device(Path::new("/"))?;
    let boot_devices = if properties.boot_on_zfs {
        Vec::new()
    } else {
        tools.probe_device(&properties.boot)?
    };

    let machine = cli.machine.unwrap_or_else(|| {
        command::machine().unwrap_or_else(|e| {
            warn!("Could not get the machine name ({e}), using {}", std::env::consts::ARCH);
            std::env::consts::ARCH.to_owned()
        })
    });

    let defaults = load_defaults(cli.defaults.as_deref().unwrap_or(Path::new(DEFAULTS_FILE)))?;
    let config = GrubConfigBuilder::new(be_root)
        .defaults(defaults)
        .properties(properties)
        .running_boot(cli.running_boot.unwrap_or_else(|| PathBuf::from(RUNNING_BOOT)))
        .root_devices(root_devices)
        .boot_devices(boot_devices)
        .assign_if_some(root_dataset, GrubConfigBuilder::root_dataset)
        .assign_if_some(cli.active, GrubConfigBuilder::active_dataset)
        .build()?;

    let menu = Generator::new(&config, &tools, &machine).generate()?;

    let mut stdout = io::stdout().lock();
    for line in menu.lines() {
        writeln!(stdout, "{line}").map_err(|source| GrubError::Io {
            path: PathBuf::from("/dev/stdout"),
            source,
        })?;
    }
    Ok(())
}

/// The actual main function of the program.
///
/// # Errors
///
/// May return an `Error` if the configuration is invalid, the boot environment tree could not be read, or a GRUB
/// tool failed.
fn main_func() -> GrubResult<ExitCode> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(args.iter().map(String::as_str)) {
        Parsed::Run(cli) => cli,
        Parsed::Help => {
            print!("{USAGE}");
            return Ok(ExitCode::SUCCESS);
        }
        Parsed::Invalid => {
            eprint!("{USAGE}");
            return Ok(ExitCode::FAILURE);
        }
    };

    StderrLogger::static_new(log_level(cli.verbosity)).install();

    if cli.update {
        let output = match cli.output {
            Some(output) => output,
            None => ZedenvProperties::from_pairs(cli.properties)?.grub_cfg_path(Path::new(RUNNING_BOOT)),
        };
        grub_mkconfig(&output)?;
        return Ok(ExitCode::SUCCESS);
    }

    generate(cli)?;
    Ok(ExitCode::SUCCESS)
}

/// The main function of the program.
///
/// Errors are printed instead of panicking, since the output of a panic would end up mixed into `grub-mkconfig`'s
/// own messages without saying which script failed.
fn main() -> ExitCode {
    main_func().unwrap_or_else(|e| {
        eprintln!("zedenv-grub: Error: {e}");
        ExitCode::FAILURE
    })
}
