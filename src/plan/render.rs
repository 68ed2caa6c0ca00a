//! Plan rendering
//!
//! Rendering moves through a fixed sequence of phases:
//!
//! `Empty → ArgumentsDeclared → ArgumentsResolved → Substituted →
//! TransfersValidated → Rendered`
//!
//! Any failure aborts the whole render. No partial plan is ever returned.

use super::args::{ArgumentRegistry, BuildOverrides, ResolvedArguments};
use super::build_plan::BuildPlan;
use super::error::PlanError;
use super::graph::StageGraph;
use super::stage::{Base, Stage};
use super::token::{substitute, UnresolvedToken};
use super::transfer::TransferResolver;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RenderPhase {
    Empty,
    ArgumentsDeclared,
    ArgumentsResolved,
    Substituted,
    TransfersValidated,
    Rendered,
}

impl RenderPhase {
    fn next(self) -> Option<RenderPhase> {
        match self {
            RenderPhase::Empty => Some(RenderPhase::ArgumentsDeclared),
            RenderPhase::ArgumentsDeclared => Some(RenderPhase::ArgumentsResolved),
            RenderPhase::ArgumentsResolved => Some(RenderPhase::Substituted),
            RenderPhase::Substituted => Some(RenderPhase::TransfersValidated),
            RenderPhase::TransfersValidated => Some(RenderPhase::Rendered),
            RenderPhase::Rendered => None,
        }
    }
}

impl fmt::Display for RenderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Renders one stage graph against one argument registry.
///
/// Each renderer owns its phase, so independent renders share nothing and
/// can run on separate threads.
pub struct PlanRenderer<'a> {
    graph: &'a StageGraph,
    registry: &'a ArgumentRegistry,
    phase: RenderPhase,
    history: Vec<RenderPhase>,
}

impl<'a> PlanRenderer<'a> {
    pub fn new(graph: &'a StageGraph, registry: &'a ArgumentRegistry) -> Self {
        Self {
            graph,
            registry,
            phase: RenderPhase::Empty,
            history: vec![RenderPhase::Empty],
        }
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    /// Phases reached so far, in order
    pub fn history(&self) -> &[RenderPhase] {
        &self.history
    }

    fn advance(&mut self, to: RenderPhase) {
        debug_assert_eq!(self.phase.next(), Some(to), "render phases are one-way");
        debug!(from = %self.phase, to = %to, "Render phase transition");
        self.phase = to;
        self.history.push(to);
    }

    /// Consume the renderer and produce a plan.
    pub fn render(mut self, overrides: BuildOverrides) -> Result<BuildPlan, PlanError> {
        if self.graph.is_empty() {
            return Err(PlanError::EmptyGraph);
        }
        self.advance(RenderPhase::ArgumentsDeclared);

        let resolved = self.registry.resolve_all(&overrides)?;
        self.advance(RenderPhase::ArgumentsResolved);

        let stages = self
            .graph
            .iter()
            .map(|stage| substitute_stage(stage, &resolved))
            .collect::<Result<Vec<_>, _>>()?;
        self.advance(RenderPhase::Substituted);

        let resolver = TransferResolver::new(self.graph);
        for stage in &stages {
            resolver.resolve_stage(stage)?;
        }
        self.advance(RenderPhase::TransfersValidated);

        let plan = BuildPlan::new(resolved.into_vec(), stages);
        self.advance(RenderPhase::Rendered);

        info!(
            stages = plan.stages().len(),
            arguments = plan.arguments().len(),
            overrides = overrides.len(),
            "Rendered build plan"
        );
        Ok(plan)
    }
}

/// Render `graph` with `registry`, applying `overrides`.
pub fn render(
    graph: &StageGraph,
    registry: &ArgumentRegistry,
    overrides: BuildOverrides,
) -> Result<BuildPlan, PlanError> {
    PlanRenderer::new(graph, registry).render(overrides)
}

fn substitute_stage(stage: &Stage, resolved: &ResolvedArguments) -> Result<Stage, PlanError> {
    let unresolved = |UnresolvedToken(token): UnresolvedToken| PlanError::UnresolvedArgument {
        stage: stage.label(),
        token,
    };
    let apply = |text: &str| substitute(text, |name| resolved.value(name));

    let base = match &stage.base {
        Base::Image(image) => Base::Image(apply(image).map_err(unresolved)?),
        Base::Stage(reference) => Base::Stage(reference.clone()),
    };

    let instructions = stage
        .instructions
        .iter()
        .map(|instruction| instruction.try_map_text(apply).map_err(unresolved))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Stage {
        id: stage.id,
        name: stage.name.clone(),
        base,
        instructions,
    })
}
