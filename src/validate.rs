// Host/domain/command-key validation at the request boundary.
// Rejection happens before any network or process call is made.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::DiagnosticError;

/// Label/TLD shape check, applied after the host character check.
static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9-]{1,61}[A-Za-z0-9]\.[A-Za-z]{2,}$")
        .expect("domain regex compiles")
});

const MAX_HOST_LEN: usize = 253;

/// Hostname or address that passed the character allow-list. Holding one
/// proves no shell metacharacters made it past the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidHost(String);

impl ValidHost {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDomain(String);

impl ValidDomain {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One entry of the fixed command allow-list: symbolic key to a literal
/// argv, executed without a shell. Caller-supplied command text is never
/// accepted.
#[derive(Debug, Clone, Copy)]
pub struct AllowedCommand {
    pub key: &'static str,
    pub program: &'static str,
    pub args: &'static [&'static str],
}

impl AllowedCommand {
    /// Display form for result payloads and logs.
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.to_string()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

pub const ALLOWED_COMMANDS: &[AllowedCommand] = &[
    AllowedCommand { key: "hostname", program: "hostname", args: &[] },
    AllowedCommand { key: "whoami", program: "whoami", args: &[] },
    AllowedCommand { key: "uptime", program: "uptime", args: &[] },
    AllowedCommand { key: "ipaddr", program: "ip", args: &["addr", "show"] },
    AllowedCommand { key: "route", program: "ip", args: &["route", "show"] },
    AllowedCommand { key: "arp", program: "ip", args: &["neigh", "show"] },
    AllowedCommand { key: "netstat", program: "ss", args: &["-tan"] },
    AllowedCommand { key: "resolv", program: "cat", args: &["/etc/resolv.conf"] },
    AllowedCommand { key: "df", program: "df", args: &["-h"] },
    AllowedCommand { key: "free", program: "free", args: &["-m"] },
    AllowedCommand { key: "sysinfo", program: "uname", args: &["-a"] },
    AllowedCommand { key: "tasklist", program: "ps", args: &["aux"] },
];

/// Accepts only `[A-Za-z0-9.-]+`, bounded length. Anything outside the
/// charset, including every shell metacharacter, rejects.
pub fn validate_host(s: &str) -> Result<ValidHost, DiagnosticError> {
    if s.is_empty() {
        return Err(DiagnosticError::InvalidInput("target host is empty".into()));
    }
    if s.len() > MAX_HOST_LEN {
        return Err(DiagnosticError::InvalidInput(format!(
            "target host exceeds {} characters",
            MAX_HOST_LEN
        )));
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(DiagnosticError::InvalidInput(
            "target host contains characters outside [A-Za-z0-9.-]".into(),
        ));
    }
    Ok(ValidHost(s.to_string()))
}

/// Host rules plus a label/TLD shape requirement.
pub fn validate_domain(s: &str) -> Result<ValidDomain, DiagnosticError> {
    let host = validate_host(s)?;
    if !DOMAIN_RE.is_match(host.as_str()) {
        return Err(DiagnosticError::InvalidInput(format!(
            "'{}' is not a valid domain name",
            host.as_str()
        )));
    }
    Ok(ValidDomain(host.0))
}

/// Membership check against the static allow-list; returns the resolved
/// fixed command.
pub fn validate_command_key(s: &str) -> Result<&'static AllowedCommand, DiagnosticError> {
    ALLOWED_COMMANDS
        .iter()
        .find(|c| c.key == s)
        .ok_or_else(|| {
            DiagnosticError::InvalidInput(format!("'{}' is not an allow-listed command", s))
        })
}
