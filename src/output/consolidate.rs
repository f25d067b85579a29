use std::collections::HashMap;
use std::net::IpAddr;

use crate::dns::pool::{LookupOutcome, LookupResult};
use crate::net::{cidr::Cidr, coalesce};

use super::pattern;

/// A set of addresses sharing one PTR answer, reduced to a CIDR block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsolidatedEntry {
    pub network: Cidr,
    /// Exact name, `*.<suffix>` wildcard, or empty for NXDOMAIN.
    pub ptr: String,
    /// Set only on single-host failure entries.
    pub error: Option<String>,
}

/// Groups results by PTR answer and reduces each group to the minimal set
/// of aligned CIDR blocks.
///
/// Two passes: addresses with identical PTR records group directly; groups
/// left with a single address are then re-grouped under their wildcard
/// pattern when the name embeds the address. A wildcard group needs at
/// least two members, otherwise the exact name is kept. Failures become
/// single-host entries. Output is sorted by network base address, IPv4
/// ahead of IPv6.
#[must_use]
pub fn consolidate(results: &[LookupResult]) -> Vec<ConsolidatedEntry> {
    let mut failures: Vec<(IpAddr, String)> = Vec::new();
    let mut groups: HashMap<String, Vec<IpAddr>> = HashMap::new();

    for result in results {
        match &result.outcome {
            LookupOutcome::Failed(err) => failures.push((result.ip, err.to_string())),
            LookupOutcome::Resolved(name) => {
                groups.entry(name.clone()).or_default().push(result.ip);
            }
            LookupOutcome::NxDomain => groups.entry(String::new()).or_default().push(result.ip),
        }
    }

    let mut entries = Vec::new();
    let mut singles: Vec<(IpAddr, String)> = Vec::new();

    for (ptr, mut ips) in groups {
        ips.sort_unstable();
        ips.dedup();

        // Lone addresses with a name are held back for the pattern pass.
        if ips.len() == 1 && !ptr.is_empty() {
            singles.push((ips[0], ptr));
            continue;
        }

        for network in coalesce::ips_to_networks(&ips) {
            entries.push(ConsolidatedEntry {
                network,
                ptr: ptr.clone(),
                error: None,
            });
        }
    }

    let mut pattern_groups: HashMap<String, Vec<(IpAddr, String)>> = HashMap::new();
    let mut unmatched: Vec<(IpAddr, String)> = Vec::new();
    for (ip, ptr) in singles {
        match pattern::extract_ptr_pattern(ip, &ptr) {
            Some(wildcard) => pattern_groups.entry(wildcard).or_default().push((ip, ptr)),
            None => unmatched.push((ip, ptr)),
        }
    }

    for (wildcard, mut members) in pattern_groups {
        if let [(ip, ptr)] = members.as_slice() {
            // A lone templated name keeps its exact PTR.
            entries.push(ConsolidatedEntry {
                network: Cidr::host(*ip),
                ptr: ptr.clone(),
                error: None,
            });
            continue;
        }

        members.sort_unstable_by_key(|(ip, _)| *ip);
        let ips: Vec<IpAddr> = members.iter().map(|(ip, _)| *ip).collect();
        for network in coalesce::ips_to_networks(&ips) {
            entries.push(ConsolidatedEntry {
                network,
                ptr: wildcard.clone(),
                error: None,
            });
        }
    }

    for (ip, ptr) in unmatched {
        entries.push(ConsolidatedEntry {
            network: Cidr::host(ip),
            ptr,
            error: None,
        });
    }

    for (ip, message) in failures {
        entries.push(ConsolidatedEntry {
            network: Cidr::host(ip),
            ptr: String::new(),
            error: Some(message),
        });
    }

    // IpAddr's order puts IPv4 bases ahead of IPv6 ones.
    entries.sort_by(|x, y| {
        x.network
            .base()
            .cmp(&y.network.base())
            .then(x.network.prefix().cmp(&y.network.prefix()))
    });
    entries
}
