use crate::error::Error;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Validates a long URL against the redirect safety policy.
///
/// Syntactic only: the URL must parse, use `http`/`https`, carry a
/// non-empty host, and must not point at loopback or private address
/// space. No DNS resolution is performed.
pub fn validate_long_url(long_url: &str) -> Result<(), Error> {
    target_policy(long_url).map_err(Error::InvalidInput)
}

/// Same policy as [`validate_long_url`], reported as the failure
/// reason so callers can wrap it in the error kind appropriate for
/// their path (invalid input at write time, invalid target at read
/// time).
pub fn target_policy(long_url: &str) -> Result<(), String> {
    if long_url.trim().is_empty() {
        return Err("URL cannot be empty".to_string());
    }

    let parsed = Url::parse(long_url).map_err(|e| format!("URL does not parse: {e}"))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(format!("URL scheme must be http or https, got '{other}'")),
    }

    match parsed.host() {
        None => Err("URL must have a host".to_string()),
        Some(Host::Domain(domain)) => {
            if domain.eq_ignore_ascii_case("localhost")
                || domain.to_ascii_lowercase().ends_with(".localhost")
            {
                Err("URL must not point at localhost".to_string())
            } else {
                Ok(())
            }
        }
        Some(Host::Ipv4(v4)) => {
            if is_private_or_loopback_v4(&v4) {
                Err(format!("URL must not point at a private address: {v4}"))
            } else {
                Ok(())
            }
        }
        Some(Host::Ipv6(v6)) => {
            if is_private_or_loopback_v6(&v6) {
                Err(format!("URL must not point at a private address: {v6}"))
            } else {
                Ok(())
            }
        }
    }
}

/// Whether an address falls in loopback or private ranges.
pub fn is_private_or_loopback(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_or_loopback_v4(v4),
        IpAddr::V6(v6) => is_private_or_loopback_v6(v6),
    }
}

fn is_private_or_loopback_v4(ip: &Ipv4Addr) -> bool {
    ip.is_private() || ip.is_loopback() || ip.is_link_local() || ip.is_unspecified()
}

fn is_private_or_loopback_v6(ip: &Ipv6Addr) -> bool {
    // fc00::/7 (ULA) and fe80::/10 (link-local) alongside loopback.
    ip.is_loopback()
        || ip.is_unspecified()
        || (ip.segments()[0] & 0xfe00) == 0xfc00
        || (ip.segments()[0] & 0xffc0) == 0xfe80
}
