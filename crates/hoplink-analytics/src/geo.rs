use async_trait::async_trait;
use hoplink_core::target::is_private_or_loopback;
use std::net::IpAddr;

/// Geographic attribution of a client address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoInfo {
    /// Country name or code; `Local` for private ranges, `Unknown`
    /// when attribution fails.
    pub country: String,
    pub city: String,
}

impl GeoInfo {
    pub fn local() -> Self {
        Self {
            country: "Local".to_string(),
            city: "Local".to_string(),
        }
    }

    pub fn unknown() -> Self {
        Self {
            country: "Unknown".to_string(),
            city: "Unknown".to_string(),
        }
    }
}

/// Pluggable geo attribution.
///
/// Implementations must never fail the pipeline: attribution problems
/// degrade to [`GeoInfo::unknown`].
#[async_trait]
pub trait GeoProvider: Send + Sync {
    async fn lookup(&self, client_address: &str) -> GeoInfo;

    /// Provider name, for logs.
    fn name(&self) -> &'static str;
}

/// Address-class heuristic: `Local` for loopback and private ranges,
/// `Unknown` for everything else. Precise geolocation plugs in behind
/// the same trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicGeoProvider;

#[async_trait]
impl GeoProvider for HeuristicGeoProvider {
    async fn lookup(&self, client_address: &str) -> GeoInfo {
        let host = client_address
            .rsplit_once(':')
            .map_or(client_address, |(host, _)| host)
            .trim_matches(['[', ']']);

        match host.parse::<IpAddr>() {
            Ok(ip) if is_private_or_loopback(&ip) => GeoInfo::local(),
            Ok(_) => GeoInfo::unknown(),
            Err(_) => match client_address.parse::<IpAddr>() {
                Ok(ip) if is_private_or_loopback(&ip) => GeoInfo::local(),
                _ => GeoInfo::unknown(),
            },
        }
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}
