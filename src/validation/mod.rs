//! Runtime policy checks for the final stage of a rendered plan

pub mod rules;
pub mod validator;

pub use rules::{Finding, FindingKind, PolicyRule, Severity};
pub use validator::{PolicyError, ValidationReport, Validator};
