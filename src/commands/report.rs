//! Command: print mutation and memory diagnostics for an override layer.
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;

use crate::cli::ReportOpts;
use crate::logging::Logger;
use crate::opts::{MemoryStats, MutationReport, OptsView};

/// A key that was written at least the requested number of times.
#[derive(Debug, Serialize)]
struct Hotspot {
    key: String,
    mutations: usize,
}

/// Everything the report command prints.
#[derive(Debug, Serialize)]
struct Report {
    view: String,
    hierarchy: Vec<String>,
    local_keys: BTreeSet<String>,
    shared_keys: BTreeSet<String>,
    memory: MemoryStats,
    mutations: MutationReport,
    hotspots: Vec<Hotspot>,
}

impl Report {
    fn collect(view: &OptsView, verbose: bool, min_mutations: usize) -> Self {
        Self {
            view: view.name().to_string(),
            hierarchy: view.hierarchy(),
            local_keys: view.get_local_keys(),
            shared_keys: view.get_shared_keys(),
            memory: view.get_memory_stats(),
            mutations: view.get_mutation_report(verbose),
            hotspots: view
                .get_hotspot_keys(min_mutations)
                .into_iter()
                .map(|(key, mutations)| Hotspot { key, mutations })
                .collect(),
        }
    }
}

/// Run the report command, writing pretty JSON to `out`.
///
/// # Errors
///
/// Returns an error if setup fails or the output cannot be written.
pub fn run(opts: &ReportOpts, log: &Logger, out: &mut dyn Write) -> Result<()> {
    let setup = super::CommandSetup::init(&opts.layer, log)?;
    log.stage("Mutation report");
    let report = Report::collect(&setup.view, opts.verbose_report, opts.min_mutations);
    if report.mutations.is_empty() {
        log.info("no mutations recorded");
    } else {
        log.info(&format!("{} key(s) mutated", report.mutations.len()));
    }
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    setup.shutdown();
    Ok(())
}
