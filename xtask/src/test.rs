use clap::Subcommand;
use duct::cmd;

#[derive(Subcommand)]
pub enum Test {
    /// Run clippy over the workspace
    Clippy,

    /// Run unit and integration tests
    Unit,
}

pub fn test_crate(command: Option<Test>) -> anyhow::Result<()> {
    match command {
        Some(Test::Clippy) => clippy()?,
        Some(Test::Unit) => unit()?,
        None => {
            clippy()?;
            unit()?;
        }
    }
    Ok(())
}

fn clippy() -> anyhow::Result<()> {
    cmd!("cargo", "clippy", "--all-targets").run()?;
    Ok(())
}

fn unit() -> anyhow::Result<()> {
    cmd!("cargo", "test", "-p", "zedenv-grub-core", "-p", "zedenv-grub-cli").run()?;
    Ok(())
}
