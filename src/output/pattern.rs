//! Detection of PTR names that embed the address they resolve to.
//!
//! ISPs commonly template reverse zones from the address itself
//! (`1.100.147.64.static.nyinternet.net`, `cpe-10-0-0-5.isp.example.com`).
//! Such names are per-host noise; reducing them to a `*.<suffix>` wildcard
//! lets the consolidator collapse whole ranges.

use std::fmt::Write as _;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Returns the `*.<suffix>` wildcard when `ptr` embeds `ip`, in any of the
/// recognized spellings; `None` when the name does not look templated.
#[must_use]
pub fn extract_ptr_pattern(ip: IpAddr, ptr: &str) -> Option<String> {
    if ptr.is_empty() {
        return None;
    }
    match ip {
        IpAddr::V4(v4) => extract_v4_pattern(v4, ptr),
        IpAddr::V6(v6) => extract_v6_pattern(v6, ptr),
    }
}

/// A bare TLD is not a meaningful pattern suffix; require two labels.
fn wildcard(suffix: &str) -> Option<String> {
    suffix.contains('.').then(|| format!("*.{suffix}"))
}

fn extract_v4_pattern(ip: Ipv4Addr, ptr: &str) -> Option<String> {
    let [a, b, c, d] = ip.octets();

    // Dotted spellings span label boundaries: a.b.c.d.suffix, d.c.b.a.suffix.
    let forward_dots = format!("{a}.{b}.{c}.{d}.");
    let reversed_dots = format!("{d}.{c}.{b}.{a}.");
    for dots in [&forward_dots, &reversed_dots] {
        if let Some(suffix) = ptr.strip_prefix(dots.as_str()) {
            return wildcard(suffix);
        }
    }

    // Dashed spellings live inside the first label.
    let (first_label, suffix) = ptr.split_once('.')?;
    if !suffix.contains('.') {
        return None;
    }

    let forward_dashes = format!("{a}-{b}-{c}-{d}");
    let reversed_dashes = format!("{d}-{c}-{b}-{a}");
    for dashes in [&forward_dashes, &reversed_dashes] {
        if first_label == *dashes || first_label.ends_with(&format!("-{dashes}")) {
            return Some(format!("*.{suffix}"));
        }
    }

    None
}

fn extract_v6_pattern(ip: Ipv6Addr, ptr: &str) -> Option<String> {
    let (first_label, suffix) = ptr.split_once('.')?;
    if !suffix.contains('.') {
        return None;
    }

    // Reverse zones are case-insensitive; generated forms are lowercase.
    let label = first_label.to_ascii_lowercase();
    for form in v6_label_forms(ip) {
        if label == form || label.ends_with(&format!("-{form}")) {
            return Some(format!("*.{suffix}"));
        }
    }

    None
}

/// The three dashed spellings of an IPv6 address seen in templated PTR
/// names: zero-padded groups, the compressed text with `:` mapped to `-`
/// (`::` becomes `--`), and the reversed nibble walk of the `ip6.arpa` zone.
fn v6_label_forms(ip: Ipv6Addr) -> [String; 3] {
    let segments = ip.segments();

    let mut padded = String::with_capacity(39);
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            padded.push('-');
        }
        let _ = write!(padded, "{segment:04x}");
    }

    let compressed = ip.to_string().replace(':', "-");

    let mut nibbles = String::with_capacity(63);
    for (i, nibble) in padded.chars().filter(|c| *c != '-').rev().enumerate() {
        if i > 0 {
            nibbles.push('-');
        }
        nibbles.push(nibble);
    }

    [padded, compressed, nibbles]
}
