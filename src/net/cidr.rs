use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use thiserror::Error;

use super::addr;
use crate::log_warn;

/// Returned by [`Cidr::size`] for blocks with 64 or more host bits, which
/// are too large to count in a `u64`.
pub const SIZE_SENTINEL: u64 = u64::MAX;

/// Expansion cap applied when no budget is given but an uncountable block
/// is present.
pub const SAFETY_CAP: u64 = 65_536;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CidrError {
    #[error("invalid CIDR {0:?}: {1}")]
    Invalid(String, String),
}

/// An address block in prefix notation. The base is stored with host bits
/// cleared, so two spellings of the same block compare equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cidr {
    base: IpAddr,
    prefix: u8,
}

impl Cidr {
    #[must_use]
    pub fn new(base: IpAddr, prefix: u8) -> Self {
        Self {
            base: addr::mask_base(base, prefix),
            prefix,
        }
    }

    /// A /32 or /128 block covering exactly one address.
    #[must_use]
    pub const fn host(ip: IpAddr) -> Self {
        let prefix = match ip {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        Self { base: ip, prefix }
    }

    #[must_use]
    pub const fn base(&self) -> IpAddr {
        self.base
    }

    #[must_use]
    pub const fn prefix(&self) -> u8 {
        self.prefix
    }

    #[must_use]
    pub fn is_single_host(&self) -> bool {
        u32::from(self.prefix) == addr::family_bits(self.base)
    }

    #[must_use]
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.base, ip) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                addr::mask_base(ip, self.prefix) == self.base
            }
            _ => false,
        }
    }

    /// The exact address count, or [`SIZE_SENTINEL`] for blocks with 64 or
    /// more host bits. Never fails for a well-formed block.
    #[must_use]
    pub fn size(&self) -> u64 {
        let host_bits = addr::family_bits(self.base) - u32::from(self.prefix);
        if host_bits >= 64 {
            SIZE_SENTINEL
        } else {
            1u64 << host_bits
        }
    }

    /// Expands the block into ascending addresses, stopping at block
    /// exhaustion or after `limit` addresses when `limit > 0`. An
    /// uncountable block with no limit falls back to [`SAFETY_CAP`].
    #[must_use]
    pub fn expand(&self, limit: u64) -> Vec<IpAddr> {
        let size = self.size();
        let count = if size == SIZE_SENTINEL {
            if limit > 0 { limit } else { SAFETY_CAP }
        } else if limit > 0 {
            size.min(limit)
        } else {
            size
        };

        let count = usize::try_from(count).unwrap_or(usize::MAX);
        let mut ips = Vec::with_capacity(count);
        let mut cursor = self.base;
        for _ in 0..count {
            ips.push(cursor);
            cursor = addr::next_ip(cursor);
        }
        ips
    }
}

impl FromStr for Cidr {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, CidrError> {
        let invalid = |reason: &str| CidrError::Invalid(s.to_string(), reason.to_string());

        let (ip_part, prefix_part) = s
            .split_once('/')
            .ok_or_else(|| invalid("missing '/' prefix separator"))?;
        let ip: IpAddr = ip_part
            .trim()
            .parse()
            .map_err(|_| invalid("unparseable address"))?;
        let prefix: u8 = prefix_part
            .trim()
            .parse()
            .map_err(|_| invalid("unparseable prefix length"))?;
        if u32::from(prefix) > addr::family_bits(ip) {
            return Err(invalid("prefix length out of range"));
        }

        Ok(Self::new(ip, prefix))
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix)
    }
}

/// Expands multiple blocks into a flat address list sharing one budget.
/// `max_ips == 0` means no cap, except that an uncountable block then forces
/// [`SAFETY_CAP`] as the effective budget. A single malformed block fails
/// the whole call; nothing is partially expanded.
pub fn parse_cidrs(cidrs: &[String], max_ips: u64) -> Result<Vec<IpAddr>, CidrError> {
    // First pass: validate syntax and total the block sizes, saturating to
    // "huge" on a sentinel or overflow.
    let mut blocks = Vec::with_capacity(cidrs.len());
    let mut total: u64 = 0;
    let mut huge = false;
    for s in cidrs {
        let block: Cidr = s.parse()?;
        let size = block.size();
        if size == SIZE_SENTINEL {
            huge = true;
        } else if !huge {
            match total.checked_add(size) {
                Some(new_total) => total = new_total,
                None => huge = true,
            }
        }
        blocks.push(block);
    }

    let budget = if max_ips == 0 && huge {
        log_warn!(format!(
            "uncountably large range with no --max-ips cap; limiting the sweep to {SAFETY_CAP} addresses"
        ));
        SAFETY_CAP
    } else {
        max_ips
    };
    if max_ips > 0 && (huge || total > max_ips) {
        log_warn!(format!("large range truncated to the first {max_ips} addresses"));
    }

    // Second pass: expand each block against the remaining budget.
    let alloc = if huge {
        budget
    } else if budget > 0 {
        total.min(budget)
    } else {
        total
    };
    let mut ips = Vec::with_capacity(usize::try_from(alloc).unwrap_or(0));
    let mut remaining = budget;
    for block in &blocks {
        let limit = if budget > 0 {
            if remaining == 0 {
                break;
            }
            remaining
        } else {
            0
        };
        let expanded = block.expand(limit);
        if budget > 0 {
            remaining -= expanded.len() as u64;
        }
        ips.extend(expanded);
    }

    Ok(ips)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn owned(strs: &[&str]) -> Vec<String> {
        strs.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn size_counts_and_sentinels() {
        let cases = [
            ("192.168.1.1/32", 1),
            ("192.168.1.0/30", 4),
            ("10.0.0.0/24", 256),
            ("172.16.0.0/16", 65_536),
            ("2001:db8::1/128", 1),
            ("2001:db8::/126", 4),
            ("2001:db8::/120", 256),
            ("2001:db8::/64", SIZE_SENTINEL),
            ("::/0", SIZE_SENTINEL),
        ];
        for (input, want) in cases {
            let block: Cidr = input.parse().unwrap();
            assert_eq!(block.size(), want, "size({input})");
        }
    }

    #[test]
    fn parse_rejects_malformed_input() {
        let inputs = [
            "not-a-cidr",
            "999.999.999.999/24",
            "192.168.1.0/33",
            "2001:db8::/129",
            "10.0.0.0/abc",
            "10.0.0.0",
        ];
        for input in inputs {
            let err = input.parse::<Cidr>().unwrap_err();
            assert!(
                err.to_string().contains("invalid CIDR"),
                "error for {input:?} was {err}"
            );
        }
    }

    #[test]
    fn parse_canonicalizes_base() {
        let block: Cidr = "192.168.1.77/24".parse().unwrap();
        assert_eq!(block.base(), ip("192.168.1.0"));
        assert_eq!(block.to_string(), "192.168.1.0/24");
    }

    #[test]
    fn contains_respects_family_and_mask() {
        let block: Cidr = "10.0.0.0/24".parse().unwrap();
        assert!(block.contains(ip("10.0.0.200")));
        assert!(!block.contains(ip("10.0.1.0")));
        assert!(!block.contains(ip("::a00:1")));
    }

    #[test]
    fn expand_small_blocks() {
        let block: Cidr = "192.168.1.0/30".parse().unwrap();
        assert_eq!(
            block.expand(0),
            vec![
                ip("192.168.1.0"),
                ip("192.168.1.1"),
                ip("192.168.1.2"),
                ip("192.168.1.3"),
            ]
        );

        let block: Cidr = "2001:db8::/126".parse().unwrap();
        assert_eq!(
            block.expand(0),
            vec![
                ip("2001:db8::"),
                ip("2001:db8::1"),
                ip("2001:db8::2"),
                ip("2001:db8::3"),
            ]
        );
    }

    #[test]
    fn expand_is_ascending_and_bounded() {
        let block: Cidr = "10.0.0.0/24".parse().unwrap();

        let all = block.expand(0);
        assert_eq!(all.len(), 256);
        assert!(all.windows(2).all(|w| w[0] < w[1]));

        assert_eq!(block.expand(100).len(), 100);
        assert_eq!(block.expand(1000).len(), 256);
    }

    #[test]
    fn expand_truncates_huge_blocks() {
        let block: Cidr = "2001:db8::/64".parse().unwrap();

        let sample = block.expand(10);
        assert_eq!(sample.len(), 10);
        assert_eq!(sample[0], ip("2001:db8::"));
        assert_eq!(sample[9], ip("2001:db8::9"));

        // No limit on an uncountable block falls back to the safety cap.
        assert_eq!(block.expand(0).len() as u64, SAFETY_CAP);
    }

    #[test]
    fn parse_cidrs_accumulates_in_input_order() {
        let ips = parse_cidrs(&owned(&["192.168.1.0/30", "10.0.0.0/30"]), 0).unwrap();
        assert_eq!(ips.len(), 8);
        assert_eq!(ips[0], ip("192.168.1.0"));
        assert_eq!(ips[4], ip("10.0.0.0"));

        let mixed = parse_cidrs(&owned(&["192.168.1.0/30", "2001:db8::/126"]), 0).unwrap();
        assert_eq!(mixed.len(), 8);
    }

    #[test]
    fn parse_cidrs_empty_list() {
        assert_eq!(parse_cidrs(&[], 0).unwrap(), Vec::<IpAddr>::new());
    }

    #[test]
    fn parse_cidrs_fails_whole_call_on_bad_block() {
        let err = parse_cidrs(&owned(&["192.168.1.0/30", "invalid"]), 0).unwrap_err();
        assert!(err.to_string().contains("invalid CIDR"));
    }

    #[test]
    fn parse_cidrs_shares_budget_across_blocks() {
        // 4 from the first block, 1 from the second.
        let ips = parse_cidrs(&owned(&["192.168.1.0/30", "10.0.0.0/30"]), 5).unwrap();
        assert_eq!(ips.len(), 5);
        assert_eq!(ips[4], ip("10.0.0.0"));

        let ips = parse_cidrs(&owned(&["192.168.1.0/30", "10.0.0.0/30"]), 10).unwrap();
        assert_eq!(ips.len(), 8);
    }

    #[test]
    fn parse_cidrs_budgets_huge_ranges() {
        let ips = parse_cidrs(&owned(&["2001:db8::/64"]), 50).unwrap();
        assert_eq!(ips.len(), 50);

        // 4 countable, then the huge block absorbs the rest of the budget.
        let ips = parse_cidrs(&owned(&["192.168.1.0/30", "2001:db8::/64"]), 10).unwrap();
        assert_eq!(ips.len(), 10);
        assert_eq!(ips[4], ip("2001:db8::"));

        // No budget given: the safety cap bounds the run.
        let ips = parse_cidrs(&owned(&["2001:db8::/64"]), 0).unwrap();
        assert_eq!(ips.len() as u64, SAFETY_CAP);
    }
}
