//! stageplan - parameterized multi-stage container build plans
//!
//! A build plan is an ordered list of stages. Each stage starts from an
//! external base image or from an earlier stage, runs instructions, and may
//! copy artifacts out of earlier stages. Stages, base images and instruction
//! operands reference declared build arguments as `${NAME}`; rendering
//! resolves every reference and yields an immutable [`BuildPlan`] whose final
//! stage is the published image.
//!
//! # Example Usage
//!
//! ```
//! use stageplan::{render, ArgumentRegistry, Base, BuildOverrides, Instruction, StageGraph};
//!
//! # fn main() -> Result<(), stageplan::PlanError> {
//! let registry = ArgumentRegistry::from_pairs([("GO_VERSION", "1.22"), ("APP_PORT", "8080")])?;
//!
//! let mut graph = StageGraph::new();
//! graph.add_stage(
//!     Some("builder"),
//!     Base::image("golang:${GO_VERSION}-alpine"),
//!     vec![Instruction::run("go build -o /out/app .")],
//! )?;
//! graph.add_stage(
//!     None,
//!     Base::image("alpine:3.20"),
//!     vec![
//!         Instruction::transfer("builder", "/out/app", "/app/app"),
//!         Instruction::user("app"),
//!         Instruction::expose("${APP_PORT}"),
//!         Instruction::entrypoint(["/app/app"]),
//!     ],
//! )?;
//!
//! let plan = render(&graph, &registry, BuildOverrides::new().with("GO_VERSION", "1.23"))?;
//! assert_eq!(plan.argument("GO_VERSION"), Some("1.23"));
//! assert_eq!(plan.final_config().exposed_ports, vec!["8080".to_string()]);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`plan`]: argument registry, stage graph, transfer checks and renderer
//! - [`validation`]: runtime policy for the published stage
//! - [`output`]: Dockerfile emission
//! - [`parsers`]: Dockerfile and YAML/JSON plan front-ends
//! - [`templates`]: built-in plans per build type
//! - [`manifest`]: argument values read from `pom.xml` and Gradle builds

pub mod cli;
pub mod config;
pub mod fs;
pub mod manifest;
pub mod output;
pub mod parsers;
pub mod plan;
pub mod templates;
pub mod util;
pub mod validation;

pub use config::{ConfigError, StageplanConfig};
pub use manifest::ManifestError;
pub use parsers::{ParseError, PlanDefinition};
pub use plan::{
    render, ArgumentRegistry, ArtifactTransfer, Base, BuildArgument, BuildOverrides, BuildPlan,
    ImageConfig, Instruction, PlanError, PlanRenderer, RenderPhase, RuntimeUser, Stage,
    StageGraph, StageId, StageRef,
};
pub use templates::{BuildTemplate, BuildType, TemplateError, TemplateRegistry};
pub use util::{init_from_env, init_logging, LoggingConfig};
pub use validation::{Finding, PolicyError, Severity, ValidationReport, Validator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
