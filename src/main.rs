mod dns;
mod io;
mod net;
mod output;

use std::{sync::Arc, time::Instant};

use anyhow::{Context, Result, ensure};
use tokio::sync::broadcast;

use crate::{
    dns::{
        pool::{self, LookupResult},
        resolver::{HickoryResolver, PtrResolver},
    },
    io::cli::{self, CommandArgs},
    net::cidr,
    output::format::{self, OutputOptions},
};

#[tokio::main]
async fn main() -> Result<()> {
    let cmd_args = cli::get_parsed_args();

    let resolver = initialize_resolver(&cmd_args)?;
    let ips = cidr::parse_cidrs(&cmd_args.cidrs, cmd_args.max_ips)?;
    ensure!(!ips.is_empty(), "no IP addresses in specified CIDR blocks");

    let (shutdown_tx, _) = broadcast::channel(1);
    install_interrupt_handler(shutdown_tx.clone())?;

    let total = ips.len();
    let results = collect_results(
        pool::lookup_all(ips, cmd_args.concurrency, resolver, &shutdown_tx),
        total,
    )
    .await;

    let resolved = results.iter().filter(|r| r.ptr().is_some()).count();
    log_info!(format!("resolved {resolved}/{total} addresses"));

    let opts = OutputOptions {
        format: cmd_args.output,
        resolved_only: cmd_args.resolved_only,
        nxdomain_only: cmd_args.nxdomain_only,
        sort: cmd_args.sort,
        expand: cmd_args.expand,
    };
    format::write_output(&mut std::io::stdout().lock(), results, &opts)
}

fn initialize_resolver(cmd_args: &CommandArgs) -> Result<Arc<dyn PtrResolver>> {
    let resolver: Arc<dyn PtrResolver> = match cmd_args.server.as_deref() {
        Some(server) => Arc::new(HickoryResolver::with_server(server)?),
        None => Arc::new(HickoryResolver::from_system()?),
    };
    Ok(resolver)
}

fn install_interrupt_handler(shutdown_tx: broadcast::Sender<()>) -> Result<()> {
    ctrlc::set_handler(move || {
        log_warn!("Interrupted, draining in-flight lookups");
        let _ = shutdown_tx.send(());
    })
    .context("failed to install interrupt handler")
}

/// Drains the result stream, keeping an advisory progress counter on stderr.
/// The counter stays hidden for the first two seconds so short sweeps finish
/// without terminal noise.
async fn collect_results(
    mut results_rx: tokio::sync::mpsc::Receiver<LookupResult>,
    total: usize,
) -> Vec<LookupResult> {
    let progress = cli::setup_progress_bar(total as u64);
    let started = Instant::now();

    let mut results = Vec::with_capacity(total);
    while let Some(result) = results_rx.recv().await {
        results.push(result);
        if progress.is_hidden() && started.elapsed() >= cli::PROGRESS_GRACE {
            cli::reveal_progress_bar(&progress);
        }
        progress.set_position(results.len() as u64);
    }
    progress.finish_and_clear();

    results
}
