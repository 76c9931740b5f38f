// Diagnostic executor: validate, rate limit, then dispatch with a hard
// timeout. A validation or rate-limit failure short-circuits before any
// network or process call is made.

pub mod dns;
pub mod ping;
pub mod runner;
pub mod shell;
pub mod tls;

use std::sync::Arc;
use std::time::Duration;

use crate::error::DiagnosticError;
use crate::models::{DiagnosticOp, DiagnosticOutcome, DiagnosticRequest, DiagnosticResult};
use crate::ratelimit::{Limit, RateLimiter};
use crate::validate;

use runner::{CommandRunner, SystemRunner};

/// Global scope key for the network-probe operations.
const NETWORK_TOOLS_SCOPE: &str = "network-tools";
/// Separate global scope for the fixed-command path.
const REMOTE_COMMANDS_SCOPE: &str = "remote-commands";

#[derive(Debug, Clone, Copy)]
pub struct DiagnosticConfig {
    /// Hard bound on every operation; timed-out work frees its resources.
    pub timeout: Duration,
    pub ping_probes: u32,
    /// Cap across all targets for network probes.
    pub global_limit: Limit,
    /// Cap per individual target.
    pub target_limit: Limit,
    /// Cap for the fixed-command path, its own scope.
    pub command_limit: Limit,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            ping_probes: 4,
            global_limit: Limit {
                max_requests: 30,
                window: Duration::from_secs(60),
            },
            target_limit: Limit {
                max_requests: 5,
                window: Duration::from_secs(60),
            },
            command_limit: Limit {
                max_requests: 20,
                window: Duration::from_secs(60),
            },
        }
    }
}

pub struct DiagnosticExecutor {
    runner: Arc<dyn CommandRunner>,
    limiter: RateLimiter,
    config: DiagnosticConfig,
}

impl DiagnosticExecutor {
    pub fn new(config: DiagnosticConfig) -> Self {
        Self::with_runner(config, Arc::new(SystemRunner))
    }

    /// Construction seam for tests: substitute the process runner.
    pub fn with_runner(config: DiagnosticConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            limiter: RateLimiter::new(),
            config,
        }
    }

    pub async fn execute(
        &self,
        request: &DiagnosticRequest,
    ) -> Result<DiagnosticResult, DiagnosticError> {
        tracing::debug!(
            operation = request.operation.as_str(),
            target = %request.target,
            "executing diagnostic"
        );
        let result = match request.operation {
            DiagnosticOp::Ping => {
                let host = validate::validate_host(&request.target)?;
                self.admit_network(host.as_str())?;
                ping::run_ping(
                    self.runner.as_ref(),
                    &host,
                    self.config.ping_probes,
                    self.config.timeout,
                )
                .await?
            }
            DiagnosticOp::Dns => {
                let host = validate::validate_host(&request.target)?;
                self.admit_network(host.as_str())?;
                DiagnosticResult::ok(dns::resolve(&host, self.config.timeout).await?)
            }
            DiagnosticOp::Traceroute => {
                let host = validate::validate_host(&request.target)?;
                self.admit_network(host.as_str())?;
                not_implemented(DiagnosticOutcome::Traceroute {
                    message: "traceroute is not implemented".into(),
                })
            }
            DiagnosticOp::PortScan => {
                let host = validate::validate_host(&request.target)?;
                self.admit_network(host.as_str())?;
                not_implemented(DiagnosticOutcome::PortScan {
                    message: "port scanning is not implemented".into(),
                })
            }
            DiagnosticOp::TlsInspect => {
                let domain = validate::validate_domain(&request.target)?;
                self.admit_network(domain.as_str())?;
                DiagnosticResult::ok(tls::inspect(&domain, self.config.timeout).await?)
            }
            DiagnosticOp::ShellCommand => {
                let command = validate::validate_command_key(&request.target)?;
                self.limiter.check(
                    REMOTE_COMMANDS_SCOPE,
                    REMOTE_COMMANDS_SCOPE,
                    self.config.command_limit,
                )?;
                shell::run_command(self.runner.as_ref(), command, self.config.timeout).await?
            }
        };
        Ok(result)
    }

    /// Global and per-target caps must both admit; nothing is recorded when
    /// either rejects.
    fn admit_network(&self, target: &str) -> Result<(), DiagnosticError> {
        let target_key = format!("target:{}", target);
        self.limiter.check_scoped(
            NETWORK_TOOLS_SCOPE,
            self.config.global_limit,
            &target_key,
            self.config.target_limit,
        )
    }
}

/// Deliberately deferred operations answer with a well-formed result
/// instead of failing the protocol.
fn not_implemented(outcome: DiagnosticOutcome) -> DiagnosticResult {
    DiagnosticResult::failed(outcome, "not implemented")
}
