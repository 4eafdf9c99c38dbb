//! Command: print the effective configuration of an override layer.
use anyhow::Result;
use std::io::Write;

use crate::cli::ShowOpts;
use crate::logging::Logger;

/// Run the show command, writing pretty JSON to `out`.
///
/// # Errors
///
/// Returns an error if setup fails or the output cannot be written.
pub fn run(opts: &ShowOpts, log: &Logger, out: &mut dyn Write) -> Result<()> {
    let setup = super::CommandSetup::init(&opts.layer, log)?;
    log.stage("Effective configuration");
    serde_json::to_writer_pretty(&mut *out, &setup.view)?;
    writeln!(out)?;
    setup.shutdown();
    Ok(())
}
