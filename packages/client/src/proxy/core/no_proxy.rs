//! No-proxy exclusion list
//!
//! Entries are parsed once when the list is built and matched against
//! already-normalized origin hosts.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Hosts that bypass a proxy.
#[derive(Clone, PartialEq, Eq)]
pub struct NoProxy {
    raw: String,
    entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Any,
    Domain(String),
    Ip(IpAddr),
    Subnet(IpAddr, u8),
}

impl NoProxy {
    /// Read `NO_PROXY` (or `no_proxy`) from the process environment.
    ///
    /// Returns `None` when neither variable is set or the value is blank.
    #[must_use]
    pub fn from_env() -> Option<NoProxy> {
        let raw = std::env::var("NO_PROXY")
            .or_else(|_| std::env::var("no_proxy"))
            .unwrap_or_default();

        Self::from_string(&raw)
    }

    /// Parse a comma separated exclusion list.
    ///
    /// * Whitespace around entries is ignored, empty entries are skipped.
    /// * `*` matches every host. It is the only wildcard.
    /// * IPv4 and IPv6 addresses match exactly, and may carry a prefix
    ///   length (`192.168.1.0/24`, `fd00::/8`).
    /// * Anything else is a domain. `example.com` and `.example.com` both
    ///   match `example.com` itself and every subdomain of it.
    ///
    /// Returns `None` when the list has no entries.
    #[must_use]
    pub fn from_string(no_proxy_list: &str) -> Option<Self> {
        let entries: Vec<Entry> = no_proxy_list
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(Entry::parse)
            .collect();

        if entries.is_empty() {
            return None;
        }

        Some(NoProxy {
            raw: no_proxy_list.trim().to_owned(),
            entries,
        })
    }

    /// Whether `host` bypasses the proxy.
    #[must_use]
    pub fn matches(&self, host: &str) -> bool {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let host_ip = host.parse::<IpAddr>().ok();

        self.entries.iter().any(|entry| match entry {
            Entry::Any => true,
            Entry::Domain(domain) => {
                host.eq_ignore_ascii_case(domain)
                    || (host.len() > domain.len()
                        && host.as_bytes()[host.len() - domain.len() - 1] == b'.'
                        && host[host.len() - domain.len()..].eq_ignore_ascii_case(domain))
            }
            Entry::Ip(ip) => host_ip == Some(*ip),
            Entry::Subnet(network, prefix) => {
                host_ip.is_some_and(|ip| ip_in_subnet(ip, *network, *prefix))
            }
        })
    }

    /// The list as it was configured.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Entry {
    fn parse(pattern: &str) -> Entry {
        if pattern == "*" {
            return Entry::Any;
        }
        if let Some((network, prefix)) = parse_cidr(pattern) {
            return Entry::Subnet(network, prefix);
        }
        let bare = pattern.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = bare.parse::<IpAddr>() {
            return Entry::Ip(ip);
        }
        Entry::Domain(pattern.trim_start_matches('.').to_ascii_lowercase())
    }
}

impl fmt::Debug for NoProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NoProxy").field(&self.raw).finish()
    }
}

fn parse_cidr(pattern: &str) -> Option<(IpAddr, u8)> {
    let (network, prefix) = pattern.split_once('/')?;
    let network = network.parse::<IpAddr>().ok()?;
    let prefix = prefix.parse::<u8>().ok()?;

    let max = match network {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    (prefix <= max).then_some((network, prefix))
}

fn ip_in_subnet(ip: IpAddr, network: IpAddr, prefix: u8) -> bool {
    match (ip, network) {
        (IpAddr::V4(ip), IpAddr::V4(net)) => v4_in_subnet(ip, net, prefix),
        (IpAddr::V6(ip), IpAddr::V6(net)) => v6_in_subnet(ip, net, prefix),
        _ => false,
    }
}

fn v4_in_subnet(ip: Ipv4Addr, network: Ipv4Addr, prefix: u8) -> bool {
    if prefix == 0 {
        return true;
    }
    let mask = u32::MAX << (32 - u32::from(prefix));
    (u32::from(ip) & mask) == (u32::from(network) & mask)
}

fn v6_in_subnet(ip: Ipv6Addr, network: Ipv6Addr, prefix: u8) -> bool {
    if prefix == 0 {
        return true;
    }
    let mask = u128::MAX << (128 - u32::from(prefix));
    (u128::from(ip) & mask) == (u128::from(network) & mask)
}
