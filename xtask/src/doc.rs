use duct::cmd;

pub fn doc_crate(private: bool, open: bool, lib: bool) -> anyhow::Result<()> {
    let mut doc_args = vec!["doc", "--no-deps"];
    if lib {
        doc_args.extend(["-p", "zedenv-grub-core"]);
    }
    if private {
        doc_args.push("--document-private-items");
    }
    if open {
        doc_args.push("--open");
    }

    cmd("cargo", doc_args).run()?;
    Ok(())
}
