//! `layered-opts` binary: inspect layered configuration from the shell.
use anyhow::Result;
use clap::Parser;

use layered_opts::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    logging::init_subscriber(args.verbose);
    let log = logging::Logger::new(args.verbose);
    let mut out = std::io::stdout().lock();

    match args.command {
        cli::Command::Show(opts) => commands::show::run(&opts, &log, &mut out),
        cli::Command::Report(opts) => commands::report::run(&opts, &log, &mut out),
        cli::Command::Version => commands::version::run(&mut out),
    }
}
