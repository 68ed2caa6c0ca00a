//! Ordered stage graph
//!
//! Stages live in an arena addressed by [`StageId`]. A stage may only point
//! at stages already in the arena, so references always go backwards and the
//! graph can never contain a cycle.

use super::error::PlanError;
use super::stage::{Base, Instruction, Stage, StageId, StageRef};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct StageGraph {
    stages: Vec<Stage>,
    names: HashMap<String, StageId>,
}

impl StageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    ///
    /// A `Base::Stage` must name a stage that was added earlier.
    pub fn add_stage(
        &mut self,
        name: Option<&str>,
        base: Base,
        instructions: Vec<Instruction>,
    ) -> Result<StageId, PlanError> {
        let id = StageId(self.stages.len());
        let label = name.map(str::to_string).unwrap_or_else(|| id.to_string());

        if let Some(name) = name {
            if self.names.contains_key(name) {
                return Err(PlanError::DuplicateStage(name.to_string()));
            }
        }

        if let Base::Stage(reference) = &base {
            if self.lookup(reference).is_none() {
                return Err(PlanError::UnknownBaseStage {
                    stage: label,
                    base: reference.to_string(),
                });
            }
        }

        debug!(stage = %label, base = ?base, instructions = instructions.len(), "Added stage");

        if let Some(name) = name {
            self.names.insert(name.to_string(), id);
        }
        self.stages.push(Stage {
            id,
            name: name.map(str::to_string),
            base,
            instructions,
        });
        Ok(id)
    }

    /// Find a stage by name or position among the stages added so far.
    pub fn lookup(&self, reference: &StageRef) -> Option<StageId> {
        match reference {
            StageRef::Name(name) => self.names.get(name).copied(),
            StageRef::Index(index) if *index < self.stages.len() => Some(StageId(*index)),
            StageRef::Index(_) => None,
        }
    }

    pub fn get(&self, id: StageId) -> Option<&Stage> {
        self.stages.get(id.0)
    }

    pub fn find(&self, reference: &StageRef) -> Option<&Stage> {
        self.lookup(reference).and_then(|id| self.get(id))
    }

    /// The stage whose image configuration is published
    pub fn final_stage(&self) -> Option<&Stage> {
        self.stages.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
