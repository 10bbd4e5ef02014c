use std::io;

use anyhow::Context;
use clap::Parser;

use shmcon::logging::setup_logging;
use shmcon::{Config, Console};

fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    setup_logging(&config.log_level);
    tracing::debug!(?config, "starting");

    let mut console = Console::new(io::stdout().lock(), io::stderr().lock());
    let flow = console
        .run_commands(&config.commands)
        .context("writing output")?;
    if flow.is_break() {
        return Ok(());
    }
    console
        .run(io::stdin().lock(), config.prompt())
        .context("console i/o")
}
