#![no_main]

use libfuzzer_sys::fuzz_target;
use zedenv_grub_core::config::{builder::GrubConfigBuilder, defaults::parse_defaults};

fuzz_target!(|data: &str| {
    let pairs = parse_defaults(data);
    let _ = GrubConfigBuilder::new("rpool/ROOT").defaults(pairs).build();
});
