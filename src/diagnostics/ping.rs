// ICMP reachability via the system ping binary

use std::time::Duration;

use crate::error::DiagnosticError;
use crate::models::{DiagnosticOutcome, DiagnosticResult};
use crate::validate::ValidHost;

use super::runner::CommandRunner;

/// Sends a bounded number of probes and reports alive/dead plus round-trip
/// time and TTL. A timeout fails closed: `alive=false`, rtt unknown, as a
/// well-formed result rather than an error.
pub async fn run_ping(
    runner: &dyn CommandRunner,
    host: &ValidHost,
    probes: u32,
    timeout: Duration,
) -> Result<DiagnosticResult, DiagnosticError> {
    let count = probes.to_string();
    let per_probe_wait = timeout.as_secs().max(1).to_string();
    let args = ["-n", "-c", count.as_str(), "-W", per_probe_wait.as_str(), host.as_str()];

    let output = match runner.run("ping", &args, timeout).await {
        Ok(o) => o,
        Err(DiagnosticError::Timeout(_)) => {
            return Ok(DiagnosticResult::ok(DiagnosticOutcome::Ping {
                alive: false,
                round_trip_ms: None,
                ttl: None,
                output: String::new(),
            }));
        }
        Err(e) => return Err(e),
    };

    let alive = output.exit_code == Some(0);
    Ok(DiagnosticResult::ok(DiagnosticOutcome::Ping {
        alive,
        round_trip_ms: if alive { parse_rtt_avg(&output.stdout) } else { None },
        ttl: if alive { parse_ttl(&output.stdout) } else { None },
        output: output.stdout,
    }))
}

/// Average rtt from the `rtt min/avg/max/mdev = a/b/c/d ms` summary line.
pub fn parse_rtt_avg(output: &str) -> Option<f64> {
    let line = output.lines().find(|l| l.contains("min/avg/max"))?;
    let values = line.split(" = ").nth(1)?;
    values.split('/').nth(1)?.trim().parse().ok()
}

/// TTL from the first reply line carrying `ttl=`.
pub fn parse_ttl(output: &str) -> Option<u32> {
    let line = output.lines().find(|l| l.contains("ttl="))?;
    let after = line.split("ttl=").nth(1)?;
    let digits: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
