use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::dns::pool::{LookupOutcome, LookupResult};
use crate::io::cli::OutputFormat;

use super::consolidate::{self, ConsolidatedEntry};

/// Controls filtering and rendering of sweep results.
#[derive(Clone, Copy, Debug, Default)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub resolved_only: bool,
    pub nxdomain_only: bool,
    pub sort: bool,
    pub expand: bool,
}

/// Widest IPv4 address; the left column never shrinks below it.
const MIN_ADDRESS_WIDTH: usize = 15;

/// Renders results in the requested shape: filter, then either per-address
/// output (optionally sorted) or the always-sorted consolidated view.
pub fn write_output<W: Write>(
    w: &mut W,
    results: Vec<LookupResult>,
    opts: &OutputOptions,
) -> Result<()> {
    let mut results = filter_results(results, opts);

    if opts.expand {
        if opts.sort {
            sort_results(&mut results);
        }
        return match opts.format {
            OutputFormat::Json => format_json(w, &results),
            OutputFormat::Text => format_text(w, &results),
        };
    }

    let entries = consolidate::consolidate(&results);
    match opts.format {
        OutputFormat::Json => format_json_consolidated(w, &entries),
        OutputFormat::Text => format_text_consolidated(w, &entries),
    }
}

pub fn filter_results(results: Vec<LookupResult>, opts: &OutputOptions) -> Vec<LookupResult> {
    if !opts.resolved_only && !opts.nxdomain_only {
        return results;
    }

    results
        .into_iter()
        .filter(|r| {
            if opts.resolved_only {
                r.ptr().is_some()
            } else {
                r.is_nxdomain()
            }
        })
        .collect()
}

pub fn sort_results(results: &mut [LookupResult]) {
    results.sort_by_key(|r| r.ip);
}

fn answer_column(outcome: &LookupOutcome) -> String {
    match outcome {
        LookupOutcome::Resolved(name) => name.clone(),
        LookupOutcome::NxDomain => "NXDOMAIN".to_string(),
        LookupOutcome::Failed(err) => format!("ERROR: {err}"),
    }
}

fn format_text<W: Write>(w: &mut W, results: &[LookupResult]) -> Result<()> {
    let width = results
        .iter()
        .map(|r| r.ip.to_string().len())
        .max()
        .unwrap_or(0)
        .max(MIN_ADDRESS_WIDTH);

    for result in results {
        let address = result.ip.to_string();
        writeln!(w, "{address:<width$} {}", answer_column(&result.outcome))?;
    }
    Ok(())
}

#[derive(Serialize)]
struct AddressRecord<'a> {
    ip: String,
    ptr: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn format_json<W: Write>(w: &mut W, results: &[LookupResult]) -> Result<()> {
    let records: Vec<AddressRecord<'_>> = results
        .iter()
        .map(|r| AddressRecord {
            ip: r.ip.to_string(),
            ptr: r.ptr(),
            error: r.error().map(ToString::to_string),
        })
        .collect();

    serde_json::to_writer_pretty(&mut *w, &records)?;
    writeln!(w)?;
    Ok(())
}

/// Single-host networks render as the bare address, without the prefix.
fn network_column(entry: &ConsolidatedEntry) -> String {
    if entry.network.is_single_host() {
        entry.network.base().to_string()
    } else {
        entry.network.to_string()
    }
}

fn consolidated_answer(entry: &ConsolidatedEntry) -> String {
    if let Some(message) = &entry.error {
        format!("ERROR: {message}")
    } else if entry.ptr.is_empty() {
        "NXDOMAIN".to_string()
    } else {
        entry.ptr.clone()
    }
}

fn format_text_consolidated<W: Write>(w: &mut W, entries: &[ConsolidatedEntry]) -> Result<()> {
    let width = entries
        .iter()
        .map(|e| network_column(e).len())
        .max()
        .unwrap_or(0)
        .max(MIN_ADDRESS_WIDTH);

    for entry in entries {
        let network = network_column(entry);
        writeln!(w, "{network:<width$} {}", consolidated_answer(entry))?;
    }
    Ok(())
}

#[derive(Serialize)]
struct NetworkRecord<'a> {
    network: String,
    ptr: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

fn format_json_consolidated<W: Write>(w: &mut W, entries: &[ConsolidatedEntry]) -> Result<()> {
    let records: Vec<NetworkRecord<'_>> = entries
        .iter()
        .map(|e| NetworkRecord {
            network: network_column(e),
            ptr: (!e.ptr.is_empty()).then_some(e.ptr.as_str()),
            error: e.error.as_deref(),
        })
        .collect();

    serde_json::to_writer_pretty(&mut *w, &records)?;
    writeln!(w)?;
    Ok(())
}
