//! Front-ends that turn text into an argument registry and a stage graph
//!
//! - [`dockerfile`]: parameterized Dockerfiles
//! - [`description`]: YAML or JSON plan descriptions

pub mod description;
pub mod dockerfile;

use crate::plan::{render, ArgumentRegistry, BuildOverrides, BuildPlan, PlanError, StageGraph};
use thiserror::Error;

pub use description::{parse_description, DescriptionFormat};
pub use dockerfile::parse as parse_dockerfile;

/// Declared arguments plus the stage graph that references them
#[derive(Debug, Clone)]
pub struct PlanDefinition {
    pub arguments: ArgumentRegistry,
    pub graph: StageGraph,
}

impl PlanDefinition {
    pub fn new(arguments: ArgumentRegistry, graph: StageGraph) -> Self {
        Self { arguments, graph }
    }

    pub fn render(&self, overrides: BuildOverrides) -> Result<BuildPlan, PlanError> {
        render(&self.graph, &self.arguments, overrides)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: {keyword} appears before the first FROM")]
    InstructionBeforeFrom { line: usize, keyword: String },

    #[error("line {line}: {keyword} is missing an operand")]
    MissingOperand { line: usize, keyword: String },

    #[error("line {line}: invalid exec form for {keyword}: {message}")]
    InvalidExecForm {
        line: usize,
        keyword: String,
        message: String,
    },

    #[error("line {line}: {message}")]
    InvalidSyntax { line: usize, message: String },

    #[error("line {line}: {source}")]
    Plan {
        line: usize,
        #[source]
        source: PlanError,
    },

    #[error("Invalid plan description at {location}: {message}")]
    InvalidDescription { location: String, message: String },

    #[error("Invalid plan description at {location}: {source}")]
    DescriptionPlan {
        location: String,
        #[source]
        source: PlanError,
    },
}

impl ParseError {
    pub(crate) fn missing_operand(line: usize, keyword: &str) -> Self {
        ParseError::MissingOperand {
            line,
            keyword: keyword.to_string(),
        }
    }

    /// 1-based Dockerfile line, when the error came from a Dockerfile
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::InstructionBeforeFrom { line, .. }
            | ParseError::MissingOperand { line, .. }
            | ParseError::InvalidExecForm { line, .. }
            | ParseError::InvalidSyntax { line, .. }
            | ParseError::Plan { line, .. } => Some(*line),
            ParseError::InvalidDescription { .. } | ParseError::DescriptionPlan { .. } => None,
        }
    }

    /// The wrapped planning error, if any
    pub fn plan_error(&self) -> Option<&PlanError> {
        match self {
            ParseError::Plan { source, .. } | ParseError::DescriptionPlan { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}
