//! Cross-stage artifact transfer checks
//!
//! This is a static, plan-level check: every transfer must name a stage that
//! exists and comes strictly earlier. Whether the source path exists inside
//! that stage is for the build engine to find out when it runs.

use super::error::PlanError;
use super::graph::StageGraph;
use super::stage::{ArtifactTransfer, Stage, StageId};
use std::collections::HashSet;
use tracing::trace;

pub struct TransferResolver<'g> {
    graph: &'g StageGraph,
}

impl<'g> TransferResolver<'g> {
    pub fn new(graph: &'g StageGraph) -> Self {
        Self { graph }
    }

    /// Resolve the source stage of `transfer` issued by `requesting`.
    pub fn resolve_transfer(
        &self,
        requesting: StageId,
        transfer: &ArtifactTransfer,
    ) -> Result<StageId, PlanError> {
        let stage_label = self
            .graph
            .get(requesting)
            .map(Stage::label)
            .unwrap_or_else(|| requesting.to_string());

        let source = self
            .graph
            .lookup(&transfer.source)
            .ok_or_else(|| PlanError::UnknownStage {
                stage: stage_label.clone(),
                source_stage: transfer.source.to_string(),
            })?;

        if source >= requesting {
            return Err(PlanError::ForwardReference {
                stage: stage_label,
                source_stage: transfer.source.to_string(),
            });
        }

        trace!(
            stage = %stage_label,
            source = %transfer.source,
            paths = ?transfer.source_paths,
            "Resolved artifact transfer"
        );
        Ok(source)
    }

    /// Resolve every transfer of `stage` and reject two transfers landing on
    /// the same destination path.
    ///
    /// `stage` may be a rendered copy of the graph's stage with the same id.
    pub fn resolve_stage(&self, stage: &Stage) -> Result<Vec<StageId>, PlanError> {
        let mut destinations = HashSet::new();
        let mut sources = Vec::new();

        for transfer in stage.transfers() {
            sources.push(self.resolve_transfer(stage.id, transfer)?);

            let destination = normalize_destination(&transfer.destination_path);
            if !destinations.insert(destination.clone()) {
                return Err(PlanError::TransferConflict {
                    stage: stage.label(),
                    destination,
                });
            }
        }

        Ok(sources)
    }
}

fn normalize_destination(path: &str) -> String {
    let trimmed = path.trim();
    let stripped = trimmed.trim_end_matches('/');
    if stripped.is_empty() && trimmed.starts_with('/') {
        "/".to_string()
    } else {
        stripped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::stage::{Base, Instruction, StageRef};

    fn graph() -> StageGraph {
        let mut graph = StageGraph::new();
        graph
            .add_stage(Some("deps"), Base::image("node:20"), vec![])
            .unwrap();
        graph
            .add_stage(Some("builder"), Base::stage("deps"), vec![])
            .unwrap();
        graph
            .add_stage(
                Some("final"),
                Base::image("node:20-alpine"),
                vec![
                    Instruction::transfer("builder", "/app/dist", "/app/dist"),
                    Instruction::transfer("deps", "/app/node_modules", "/app/node_modules"),
                ],
            )
            .unwrap();
        graph
    }

    #[test]
    fn test_backward_transfer_resolves() {
        let graph = graph();
        let resolver = TransferResolver::new(&graph);
        let transfer = ArtifactTransfer::new(StageRef::name("builder"), "/out", "/out");
        assert_eq!(
            resolver.resolve_transfer(StageId(2), &transfer).unwrap(),
            StageId(1)
        );
    }

    #[test]
    fn test_self_reference_is_forward() {
        let graph = graph();
        let resolver = TransferResolver::new(&graph);
        let transfer = ArtifactTransfer::new(StageRef::name("builder"), "/out", "/out");
        assert!(matches!(
            resolver.resolve_transfer(StageId(1), &transfer),
            Err(PlanError::ForwardReference { .. })
        ));
    }

    #[test]
    fn test_later_stage_is_forward() {
        let graph = graph();
        let resolver = TransferResolver::new(&graph);
        let by_name = ArtifactTransfer::new(StageRef::name("final"), "/x", "/x");
        let by_index = ArtifactTransfer::new(StageRef::Index(2), "/x", "/x");
        for transfer in [by_name, by_index] {
            assert!(matches!(
                resolver.resolve_transfer(StageId(0), &transfer),
                Err(PlanError::ForwardReference { .. })
            ));
        }
    }

    #[test]
    fn test_unknown_source_stage() {
        let graph = graph();
        let resolver = TransferResolver::new(&graph);
        let transfer = ArtifactTransfer::new(StageRef::name("alpine:3.19"), "/x", "/x");
        assert_eq!(
            resolver.resolve_transfer(StageId(2), &transfer),
            Err(PlanError::UnknownStage {
                stage: "final".to_string(),
                source_stage: "alpine:3.19".to_string(),
            })
        );
    }

    #[test]
    fn test_resolve_stage_collects_sources() {
        let graph = graph();
        let resolver = TransferResolver::new(&graph);
        let final_stage = graph.final_stage().unwrap();
        assert_eq!(
            resolver.resolve_stage(final_stage).unwrap(),
            vec![StageId(1), StageId(0)]
        );
    }

    #[test]
    fn test_conflicting_destinations() {
        let mut graph = StageGraph::new();
        graph
            .add_stage(Some("builder"), Base::image("golang:1.22"), vec![])
            .unwrap();
        let id = graph
            .add_stage(
                None,
                Base::image("alpine"),
                vec![
                    Instruction::transfer("builder", "/src/a", "/app/bin/"),
                    Instruction::transfer("builder", "/src/b", "/app/bin"),
                ],
            )
            .unwrap();

        let resolver = TransferResolver::new(&graph);
        let err = resolver.resolve_stage(graph.get(id).unwrap()).unwrap_err();
        assert_eq!(
            err,
            PlanError::TransferConflict {
                stage: "1".to_string(),
                destination: "/app/bin".to_string(),
            }
        );
    }

    #[test]
    fn test_normalize_destination() {
        assert_eq!(normalize_destination("/app/"), "/app");
        assert_eq!(normalize_destination("/"), "/");
        assert_eq!(normalize_destination("//"), "/");
        assert_eq!(normalize_destination("app.jar"), "app.jar");
    }
}
