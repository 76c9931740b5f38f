// Forward DNS resolution

use std::time::Duration;

use crate::error::DiagnosticError;
use crate::models::DiagnosticOutcome;
use crate::validate::ValidHost;

/// Resolves the host and reports the first address with its family.
/// NXDOMAIN and other resolver failures surface as typed errors, never a
/// crash.
pub async fn resolve(
    host: &ValidHost,
    timeout: Duration,
) -> Result<DiagnosticOutcome, DiagnosticError> {
    let mut addrs = tokio::time::timeout(timeout, tokio::net::lookup_host((host.as_str(), 0)))
        .await
        .map_err(|_| DiagnosticError::Timeout(timeout))?
        .map_err(|e| {
            DiagnosticError::ConnectError(format!("resolution failed for {}: {}", host.as_str(), e))
        })?;

    let addr = addrs.next().ok_or_else(|| {
        DiagnosticError::ConnectError(format!("no addresses found for {}", host.as_str()))
    })?;

    Ok(DiagnosticOutcome::Dns {
        address: addr.ip().to_string(),
        family: if addr.is_ipv4() { "IPv4" } else { "IPv6" }.to_string(),
    })
}
