#![no_main]

use libfuzzer_sys::fuzz_target;
use zedenv_grub_core::{entry, scan};

fuzz_target!(|data: &str| {
    let _ = entry::linux_version(data);
    let _ = entry::boot_environment_from_relpath(data);
    let _ = scan::genkernel_arch(data);
});
