use std::io;

use anyhow::Result;
use clap::Parser;
use emukrnl_lib::bootstrap::tracing::init_tracing_subscriber;
use emukrnl_lib::cli::{self, Cli};

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing_subscriber()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    cli::run(args, &mut out)
}
