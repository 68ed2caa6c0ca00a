//! Render-time error kinds

use thiserror::Error;

/// Errors raised while declaring arguments, assembling the stage graph or
/// rendering a build plan.
///
/// Every variant names the offending argument or stage. None of them are
/// retried: rendering is deterministic, so the input has to change first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Argument '{0}' is already declared")]
    DuplicateArgument(String),

    #[error("Argument '{name}' was never declared{}", suggestion_suffix(.suggestion))]
    UndeclaredArgument {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Invalid argument name '{0}': expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidArgumentName(String),

    #[error("Invalid override '{0}': expected KEY=VALUE")]
    InvalidOverride(String),

    #[error("Stage '{stage}' derives from unknown stage '{base}'")]
    UnknownBaseStage { stage: String, base: String },

    #[error("Stage name '{0}' is already used")]
    DuplicateStage(String),

    #[error("Stage '{stage}' copies from '{source_stage}', which is not declared before it")]
    ForwardReference { stage: String, source_stage: String },

    #[error("Stage '{stage}' copies from unknown stage '{source_stage}'")]
    UnknownStage { stage: String, source_stage: String },

    #[error("Stage '{stage}' receives more than one transfer into '{destination}'")]
    TransferConflict { stage: String, destination: String },

    #[error("Unresolved argument reference '{token}' in stage '{stage}'")]
    UnresolvedArgument { stage: String, token: String },

    #[error("Cannot render an empty stage graph")]
    EmptyGraph,
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{}'?)", name),
        None => String::new(),
    }
}

impl PlanError {
    pub fn undeclared(name: impl Into<String>) -> Self {
        PlanError::UndeclaredArgument {
            name: name.into(),
            suggestion: None,
        }
    }

    /// Short machine-friendly kind, used in JSON/YAML error output.
    pub fn kind(&self) -> &'static str {
        match self {
            PlanError::DuplicateArgument(_) => "DuplicateArgument",
            PlanError::UndeclaredArgument { .. } => "UndeclaredArgument",
            PlanError::InvalidArgumentName(_) => "InvalidArgumentName",
            PlanError::InvalidOverride(_) => "InvalidOverride",
            PlanError::UnknownBaseStage { .. } => "UnknownBaseStage",
            PlanError::DuplicateStage(_) => "DuplicateStage",
            PlanError::ForwardReference { .. } => "ForwardReference",
            PlanError::UnknownStage { .. } => "UnknownStage",
            PlanError::TransferConflict { .. } => "TransferConflict",
            PlanError::UnresolvedArgument { .. } => "UnresolvedArgument",
            PlanError::EmptyGraph => "EmptyGraph",
        }
    }
}
