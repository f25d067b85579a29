use std::time::Duration;

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use strum_macros::Display;

use crate::log_error;

/// Output rendering formats
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Command-line arguments for the program
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
#[command(
    name = "ptrsweep",
    version = env!("CARGO_PKG_VERSION"),
    about = "Bulk reverse-DNS (PTR) lookups over CIDR ranges",
    long_about = "ptrsweep performs bulk PTR lookups on the addresses of one or more CIDR\n\
        blocks, IPv4 or IPv6, using concurrent queries for speed.\n\n\
        By default addresses sharing the same PTR record are consolidated into\n\
        CIDR networks, making output much more compact. Use --expand to show\n\
        individual addresses instead.\n\n\
        Large ranges are truncated to --max-ips addresses, so huge blocks like\n\
        an IPv6 /64 can be sampled without error.",
    after_help = "Examples:\n  \
        ptrsweep 8.8.8.0/30                    Consolidated output (default)\n  \
        ptrsweep -e 8.8.8.0/30                 Per-address output\n  \
        ptrsweep -c 100 192.168.1.0/24         100 concurrent lookups\n  \
        ptrsweep -o json -r 10.0.0.0/24        JSON, resolved addresses only\n  \
        ptrsweep --max-ips 100 2001:db8::/64   Sample the start of a huge range\n  \
        ptrsweep -S 1.1.1.1 192.168.1.0/24     Query a specific DNS server"
)]
pub struct CommandArgs {
    /// CIDR blocks to sweep (IPv4 or IPv6)
    #[arg(required = true, value_name = "CIDR")]
    pub cidrs: Vec<String>,

    /// Number of concurrent PTR lookups
    #[arg(
        short = 'c',
        long,
        default_value_t = 50,
        env = "PTRSWEEP_CONCURRENCY"
    )]
    pub concurrency: usize,

    /// Output format
    #[arg(
        short = 'o',
        long,
        value_enum,
        default_value_t = OutputFormat::Text,
        ignore_case = true,
        env = "PTRSWEEP_OUTPUT"
    )]
    pub output: OutputFormat,

    /// Only show addresses with PTR records
    #[arg(short = 'r', long, default_value_t = false)]
    pub resolved_only: bool,

    /// Only show addresses without PTR records
    #[arg(short = 'n', long, default_value_t = false)]
    pub nxdomain_only: bool,

    /// Sort per-address output by address (consolidated output is always sorted)
    #[arg(short = 's', long, default_value_t = false)]
    pub sort: bool,

    /// Show per-address output instead of consolidated CIDR networks
    #[arg(short = 'e', long, default_value_t = false)]
    pub expand: bool,

    /// Maximum addresses to expand across all blocks (0 = no cap)
    #[arg(short = 'm', long, default_value_t = 65_536, env = "PTRSWEEP_MAX_IPS")]
    pub max_ips: u64,

    /// Send queries to this DNS server (host[:port]) instead of the system resolver
    #[arg(short = 'S', long, env = "PTRSWEEP_SERVER")]
    pub server: Option<String>,
}

impl CommandArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.resolved_only && self.nxdomain_only {
            return Err(
                "the arguments '--resolved-only' and '--nxdomain-only' are mutually exclusive"
                    .to_string(),
            );
        }

        if self.concurrency < 1 {
            return Err("concurrency must be at least 1".to_string());
        }

        Ok(())
    }
}

/// Retrieves and validates the parsed command-line arguments
pub fn get_parsed_args() -> CommandArgs {
    let args = CommandArgs::parse();
    if let Err(e) = args.validate() {
        log_error!(e);
        std::process::exit(1);
    }
    args
}

/// Hold the counter back this long so short sweeps finish without drawing it.
pub const PROGRESS_GRACE: Duration = Duration::from_secs(2);

const PROGRESS_REDRAW_HZ: u8 = 2;

/// Sets up the lookup progress counter, initially hidden.
pub fn setup_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::hidden());
    let style = ProgressStyle::default_bar()
        .template("Looking up addresses... {pos}/{len} ({percent}%)")
        .expect("Invalid template");
    pb.set_style(style);
    pb
}

/// Points the counter at stderr, redrawn at most twice per second. Drawing
/// is suppressed entirely when stderr is not a terminal.
pub fn reveal_progress_bar(pb: &ProgressBar) {
    pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(PROGRESS_REDRAW_HZ));
}
