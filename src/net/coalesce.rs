//! Reduction of sorted address lists to minimal aligned CIDR covers.

use std::net::IpAddr;

use super::{addr, cidr::Cidr};

/// Splits a sorted address list into maximal runs of consecutive addresses
/// (each neighbor pair differs by exactly one increment).
fn contiguous_runs(sorted: &[IpAddr]) -> Vec<&[IpAddr]> {
    let mut runs = Vec::new();
    if sorted.is_empty() {
        return runs;
    }

    let mut start = 0;
    for i in 1..sorted.len() {
        if !addr::is_adjacent(sorted[i - 1], sorted[i]) {
            runs.push(&sorted[start..i]);
            start = i;
        }
    }
    runs.push(&sorted[start..]);
    runs
}

/// Greedy minimal cover of one contiguous run: at each position, emit the
/// largest aligned power-of-two block that fits in the remaining addresses.
fn run_to_networks(run: &[IpAddr]) -> Vec<Cidr> {
    let mut networks = Vec::new();
    if run.is_empty() {
        return networks;
    }

    let total_bits = addr::family_bits(run[0]);
    let mut pos = 0usize;
    while pos < run.len() {
        let remaining = (run.len() - pos) as u128;
        let alignment = addr::trailing_zero_bits(run[pos]);

        let mut block_bits = 0u32;
        while block_bits < alignment && (1u128 << (block_bits + 1)) <= remaining {
            block_bits += 1;
        }

        let prefix = (total_bits - block_bits) as u8;
        networks.push(Cidr::new(run[pos], prefix));
        pos += 1usize << block_bits;
    }

    networks
}

/// Converts a sorted address list (possibly with gaps) into the minimal set
/// of aligned CIDR blocks covering it exactly.
#[must_use]
pub fn ips_to_networks(sorted: &[IpAddr]) -> Vec<Cidr> {
    contiguous_runs(sorted)
        .into_iter()
        .flat_map(run_to_networks)
        .collect()
}
