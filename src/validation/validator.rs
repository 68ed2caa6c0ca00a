use crate::plan::BuildPlan;
use crate::validation::rules::{
    EntryCommandRule, ExposedPortRule, Finding, FindingKind, PolicyRule, RuntimeUserRule,
    Severity,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Hard policy failures on the final stage
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Insecure runtime user: {0}")]
    InsecureRuntimeUser(String),

    #[error("Missing entry command: {0}")]
    MissingEntryCommand(String),

    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("No exposed port: {0}")]
    NoExposedPort(String),
}

impl From<&Finding> for PolicyError {
    fn from(finding: &Finding) -> Self {
        let message = finding.message.clone();
        match finding.kind {
            FindingKind::InsecureRuntimeUser => PolicyError::InsecureRuntimeUser(message),
            FindingKind::MissingEntryCommand => PolicyError::MissingEntryCommand(message),
            FindingKind::InvalidPort => PolicyError::InvalidPort(message),
            FindingKind::NoExposedPort => PolicyError::NoExposedPort(message),
        }
    }
}

/// Findings for one plan. The plan itself is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
    }

    pub fn contains(&self, kind: FindingKind) -> bool {
        self.findings.iter().any(|f| f.kind == kind)
    }

    /// Fail on the first error finding, or on any finding when `strict`.
    pub fn check(&self, strict: bool) -> Result<(), PolicyError> {
        let fatal = self
            .findings
            .iter()
            .find(|f| f.severity == Severity::Error || strict);
        match fatal {
            Some(finding) => Err(PolicyError::from(finding)),
            None => Ok(()),
        }
    }

    pub fn into_result(self) -> Result<Vec<Finding>, PolicyError> {
        self.check(false)?;
        Ok(self.findings)
    }
}

pub struct Validator {
    rules: Vec<Box<dyn PolicyRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<Box<dyn PolicyRule>>) -> Self {
        Self { rules }
    }

    pub fn validate(&self, plan: &BuildPlan) -> ValidationReport {
        let config = plan.final_config();
        let mut report = ValidationReport::default();

        for rule in &self.rules {
            let findings = rule.check(plan, &config);
            debug!(rule = rule.name(), findings = findings.len(), "Applied policy rule");
            for finding in &findings {
                if finding.severity == Severity::Warning {
                    warn!("{}", finding);
                }
            }
            report.findings.extend(findings);
        }

        report
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(RuntimeUserRule),
                Box::new(EntryCommandRule),
                Box::new(ExposedPortRule),
            ],
        }
    }
}
