use serde::Serialize;

use super::registry::TenantRegistry;

/// Where the tenant id for a request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    Path,
    Host,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub tenant_id: String,
    pub source: ResolutionSource,
}

/// Map a request to a tenant id.
///
/// The first non-empty path segment wins when it names a registered tenant
/// (`/app1/api/v1/...`). Otherwise the first label of the host is tried
/// (`app1.example.com`), and failing both the configured default id is returned.
/// Never fails; the default id does not have to be registered.
pub fn resolve(path: &str, host: Option<&str>, registry: &TenantRegistry, default_id: &str) -> Resolution {
    if let Some(segment) = first_path_segment(path) {
        if registry.contains(segment) {
            return Resolution {
                tenant_id: segment.to_string(),
                source: ResolutionSource::Path,
            };
        }
    }

    if let Some(subdomain) = host.and_then(subdomain_of) {
        if registry.contains(subdomain) {
            return Resolution {
                tenant_id: subdomain.to_string(),
                source: ResolutionSource::Host,
            };
        }
    }

    Resolution {
        tenant_id: default_id.to_string(),
        source: ResolutionSource::Default,
    }
}

pub fn first_path_segment(path: &str) -> Option<&str> {
    path.split('/').find(|segment| !segment.is_empty())
}

/// First DNS label of a `Host` header value, port stripped.
pub fn subdomain_of(host: &str) -> Option<&str> {
    let host = host.trim();
    let without_port = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    without_port.split('.').next().filter(|label| !label.is_empty())
}
