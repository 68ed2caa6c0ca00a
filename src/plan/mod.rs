//! Parameterized multi-stage build plan model
//!
//! - [`args`]: declared build arguments and caller overrides
//! - [`graph`]: ordered stages with backward-only references
//! - [`transfer`]: provenance checks for cross-stage copies
//! - [`render`]: argument substitution into an immutable [`BuildPlan`]

pub mod args;
pub mod build_plan;
pub mod error;
pub mod graph;
pub mod render;
pub mod stage;
pub mod token;
pub mod transfer;

pub use args::{ArgumentRegistry, BuildArgument, BuildOverrides, ResolvedArguments};
pub use build_plan::{BuildPlan, ImageConfig};
pub use error::PlanError;
pub use graph::StageGraph;
pub use render::{render, PlanRenderer, RenderPhase};
pub use stage::{ArtifactTransfer, Base, Instruction, RuntimeUser, Stage, StageId, StageRef};
pub use transfer::TransferResolver;
