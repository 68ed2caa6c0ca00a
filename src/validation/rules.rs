use crate::plan::{BuildPlan, ImageConfig};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FindingKind {
    InsecureRuntimeUser,
    MissingEntryCommand,
    NoExposedPort,
    InvalidPort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub rule: &'static str,
    pub severity: Severity,
    pub kind: FindingKind,
    pub message: String,
}

impl Finding {
    pub fn error(rule: &'static str, kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            rule,
            severity: Severity::Error,
            kind,
            message: message.into(),
        }
    }

    pub fn warning(rule: &'static str, kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            rule,
            severity: Severity::Warning,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.rule, self.severity, self.message)
    }
}

/// A check over the published configuration of a plan's final stage
pub trait PolicyRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, plan: &BuildPlan, config: &ImageConfig) -> Vec<Finding>;
}

pub struct RuntimeUserRule;

impl PolicyRule for RuntimeUserRule {
    fn name(&self) -> &'static str {
        "RuntimeUser"
    }

    fn check(&self, _plan: &BuildPlan, config: &ImageConfig) -> Vec<Finding> {
        match &config.user {
            None => vec![Finding::error(
                self.name(),
                FindingKind::InsecureRuntimeUser,
                "Final stage runs as the default (root) user; declare a non-root USER",
            )],
            Some(user) if user.is_privileged() => vec![Finding::error(
                self.name(),
                FindingKind::InsecureRuntimeUser,
                format!("Final stage runs as privileged user '{}'", user),
            )],
            Some(_) => vec![],
        }
    }
}

pub struct EntryCommandRule;

impl PolicyRule for EntryCommandRule {
    fn name(&self) -> &'static str {
        "EntryCommand"
    }

    fn check(&self, _plan: &BuildPlan, config: &ImageConfig) -> Vec<Finding> {
        if config.has_entry_command() {
            vec![]
        } else {
            vec![Finding::error(
                self.name(),
                FindingKind::MissingEntryCommand,
                "Final stage defines neither ENTRYPOINT nor CMD",
            )]
        }
    }
}

/// Port declarations are advisory: not every artifact is a network service.
pub struct ExposedPortRule;

impl PolicyRule for ExposedPortRule {
    fn name(&self) -> &'static str {
        "ExposedPort"
    }

    fn check(&self, _plan: &BuildPlan, config: &ImageConfig) -> Vec<Finding> {
        if config.exposed_ports.is_empty() {
            return vec![Finding::warning(
                self.name(),
                FindingKind::NoExposedPort,
                "Final stage does not declare a listening port",
            )];
        }

        config
            .exposed_ports
            .iter()
            .filter(|port| parse_port(port).is_none())
            .map(|port| {
                Finding::error(
                    self.name(),
                    FindingKind::InvalidPort,
                    format!("'{}' is not a valid port (expected 1-65535[/tcp|/udp])", port),
                )
            })
            .collect()
    }
}

/// Parse `8080`, `8080/tcp` or `53/udp`.
pub fn parse_port(spec: &str) -> Option<u16> {
    let (number, protocol) = match spec.trim().split_once('/') {
        Some((number, protocol)) => (number, Some(protocol)),
        None => (spec.trim(), None),
    };
    if let Some(protocol) = protocol {
        if !protocol.eq_ignore_ascii_case("tcp") && !protocol.eq_ignore_ascii_case("udp") {
            return None;
        }
    }
    match number.parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(port) => Some(port),
    }
}
