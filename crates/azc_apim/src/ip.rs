//! IP allow-list entries.
//!
//! The gateway's ip filter takes single addresses and explicit ranges, so
//! CIDR blocks are expanded to their first and last address.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{PolicyError, PolicyResult};

/// One allow-list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpEntry {
    Address(IpAddr),
    Range { from: IpAddr, to: IpAddr },
}

impl IpEntry {
    /// Parse `a.b.c.d`, `a.b.c.d/n` or the IPv6 equivalents.
    ///
    /// A `/32` (or `/128`) block collapses to a single address.
    pub fn parse(raw: &str) -> PolicyResult<Self> {
        let raw = raw.trim();
        let invalid = || PolicyError::InvalidAddress(raw.to_string());

        let Some((addr, prefix)) = raw.split_once('/') else {
            return raw.parse::<IpAddr>().map(IpEntry::Address).map_err(|_| invalid());
        };

        let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let prefix: u32 = prefix.parse().map_err(|_| invalid())?;

        let (from, to) = match addr {
            IpAddr::V4(v4) => {
                if prefix > 32 {
                    return Err(invalid());
                }
                let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
                let first = u32::from(v4) & mask;
                let last = first | !mask;
                (
                    IpAddr::V4(Ipv4Addr::from(first)),
                    IpAddr::V4(Ipv4Addr::from(last)),
                )
            }
            IpAddr::V6(v6) => {
                if prefix > 128 {
                    return Err(invalid());
                }
                let mask = u128::MAX.checked_shl(128 - prefix).unwrap_or(0);
                let first = u128::from(v6) & mask;
                let last = first | !mask;
                (
                    IpAddr::V6(Ipv6Addr::from(first)),
                    IpAddr::V6(Ipv6Addr::from(last)),
                )
            }
        };

        if from == to {
            Ok(IpEntry::Address(from))
        } else {
            Ok(IpEntry::Range { from, to })
        }
    }
}
