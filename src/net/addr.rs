//! Family-uniform address arithmetic over `IpAddr`.
//!
//! IPv4 and IPv6 addresses are treated as big-endian `u32`/`u128` values.
//! Cross-family ordering rides on `IpAddr`'s derived `Ord`: the family tag
//! sorts first (IPv4 before IPv6), then the raw bytes within a family.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Bit width of the address family (32 for IPv4, 128 for IPv6).
#[must_use]
pub const fn family_bits(ip: IpAddr) -> u32 {
    match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// The next address in the same family, wrapping at the top of the space.
/// Callers must bound their own iteration; the wrap is not a stop signal.
#[must_use]
pub fn next_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V4(v4) => IpAddr::V4(Ipv4Addr::from(u32::from(v4).wrapping_add(1))),
        IpAddr::V6(v6) => IpAddr::V6(Ipv6Addr::from(u128::from(v6).wrapping_add(1))),
    }
}

/// Trailing zero bits of the address value. The all-zeros address yields the
/// full family width. Determines the maximum CIDR alignment of a block
/// starting at this address.
#[must_use]
pub fn trailing_zero_bits(ip: IpAddr) -> u32 {
    match ip {
        IpAddr::V4(v4) => u32::from(v4).trailing_zeros(),
        IpAddr::V6(v6) => u128::from(v6).trailing_zeros(),
    }
}

/// A `bits`-wide mask with the top `prefix` bits set.
#[must_use]
pub fn prefix_mask(bits: u32, prefix: u8) -> u128 {
    let prefix = u32::from(prefix).min(bits);
    if prefix == 0 {
        return 0;
    }
    let all = if bits == 128 {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    };
    let host_bits = bits - prefix;
    all & !((1u128 << host_bits) - 1)
}

/// The address with its host bits cleared under a `prefix`-bit mask.
#[must_use]
pub fn mask_base(ip: IpAddr, prefix: u8) -> IpAddr {
    match ip {
        IpAddr::V4(v4) => {
            let masked = u32::from(v4) & prefix_mask(32, prefix) as u32;
            IpAddr::V4(Ipv4Addr::from(masked))
        }
        IpAddr::V6(v6) => {
            let masked = u128::from(v6) & prefix_mask(128, prefix);
            IpAddr::V6(Ipv6Addr::from(masked))
        }
    }
}

/// True when `b` immediately follows `a` within the same family. The top of
/// the address space has no successor.
#[must_use]
pub fn is_adjacent(a: IpAddr, b: IpAddr) -> bool {
    match (a, b) {
        (IpAddr::V4(x), IpAddr::V4(y)) => u32::from(x).checked_add(1) == Some(u32::from(y)),
        (IpAddr::V6(x), IpAddr::V6(y)) => u128::from(x).checked_add(1) == Some(u128::from(y)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn next_ip_increments() {
        let cases = [
            ("192.168.1.1", "192.168.1.2"),
            ("192.168.1.255", "192.168.2.0"),
            ("192.168.255.255", "192.169.0.0"),
            ("255.255.255.255", "0.0.0.0"),
            ("2001:db8::1", "2001:db8::2"),
            ("2001:db8::ff", "2001:db8::100"),
            ("2001:db8::ffff", "2001:db8::1:0"),
        ];
        for (input, want) in cases {
            assert_eq!(next_ip(ip(input)), ip(want), "next_ip({input})");
        }
    }

    #[test]
    fn trailing_zero_bits_counts() {
        let cases = [
            ("192.168.1.0", 8),
            ("192.168.1.1", 0),
            ("10.0.0.4", 2),
            ("10.0.0.128", 7),
            ("0.0.0.0", 32),
            ("::1", 0),
            ("::", 128),
            ("::100", 8),
        ];
        for (input, want) in cases {
            assert_eq!(trailing_zero_bits(ip(input)), want, "trailing_zero_bits({input})");
        }
    }

    #[test]
    fn prefix_mask_boundaries() {
        assert_eq!(prefix_mask(32, 0), 0);
        assert_eq!(prefix_mask(32, 24), 0xffff_ff00);
        assert_eq!(prefix_mask(32, 32), 0xffff_ffff);
        assert_eq!(prefix_mask(128, 0), 0);
        assert_eq!(prefix_mask(128, 128), u128::MAX);
        assert_eq!(prefix_mask(128, 64), u128::MAX << 64);
    }

    #[test]
    fn mask_base_clears_host_bits() {
        assert_eq!(mask_base(ip("192.168.1.77"), 24), ip("192.168.1.0"));
        assert_eq!(mask_base(ip("192.168.1.77"), 32), ip("192.168.1.77"));
        assert_eq!(mask_base(ip("2001:db8::beef"), 64), ip("2001:db8::"));
    }

    #[test]
    fn adjacency_within_family_only() {
        assert!(is_adjacent(ip("10.0.0.1"), ip("10.0.0.2")));
        assert!(!is_adjacent(ip("10.0.0.1"), ip("10.0.0.3")));
        assert!(!is_adjacent(ip("10.0.0.1"), ip("::a00:2")));
        assert!(!is_adjacent(ip("255.255.255.255"), ip("0.0.0.0")));
        assert!(is_adjacent(ip("2001:db8::ffff"), ip("2001:db8::1:0")));
    }

    #[test]
    fn ipv4_orders_before_ipv6() {
        assert!(ip("255.255.255.255") < ip("::"));
    }
}
