//! Rendered build plan
//!
//! A `BuildPlan` is produced by the renderer and has no mutators. It holds
//! the resolved arguments and the stages with every argument reference
//! substituted.

use super::args::BuildArgument;
use super::stage::{Base, Instruction, RuntimeUser, Stage, StageId, StageRef};
use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    arguments: Vec<BuildArgument>,
    stages: Vec<Stage>,
}

/// Image configuration a stage publishes once its instructions ran
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageConfig {
    /// External image at the root of the stage's base chain
    pub base_image: String,
    pub user: Option<RuntimeUser>,
    pub created_users: Vec<RuntimeUser>,
    pub exposed_ports: Vec<String>,
    pub entrypoint: Option<Vec<String>>,
    pub cmd: Option<Vec<String>>,
    pub workdir: Option<String>,
    pub env: BTreeMap<String, String>,
}

impl ImageConfig {
    pub fn has_entry_command(&self) -> bool {
        let non_empty = |args: &Option<Vec<String>>| args.as_ref().is_some_and(|a| !a.is_empty());
        non_empty(&self.entrypoint) || non_empty(&self.cmd)
    }

    fn apply(&mut self, instructions: &[Instruction]) {
        let mut own_cmd = false;
        for instruction in instructions {
            match instruction {
                Instruction::Workdir(path) => self.workdir = Some(path.clone()),
                Instruction::Env { key, value } => {
                    self.env.insert(key.clone(), value.clone());
                }
                Instruction::CreateUser(user) => self.created_users.push(user.clone()),
                Instruction::User(user) => self.user = Some(user.clone()),
                Instruction::Expose(port) => {
                    if !self.exposed_ports.contains(port) {
                        self.exposed_ports.push(port.clone());
                    }
                }
                Instruction::Entrypoint(args) => {
                    self.entrypoint = Some(args.clone());
                    // An inherited CMD no longer matches the new entrypoint
                    if !own_cmd {
                        self.cmd = None;
                    }
                }
                Instruction::Cmd(args) => {
                    self.cmd = Some(args.clone());
                    own_cmd = true;
                }
                Instruction::Copy { .. }
                | Instruction::Transfer(_)
                | Instruction::Run(_)
                | Instruction::Label { .. }
                | Instruction::Raw(_) => {}
            }
        }
    }
}

impl BuildPlan {
    pub(crate) fn new(arguments: Vec<BuildArgument>, stages: Vec<Stage>) -> Self {
        Self { arguments, stages }
    }

    pub fn arguments(&self) -> &[BuildArgument] {
        &self.arguments
    }

    pub fn argument(&self, name: &str) -> Option<&str> {
        self.arguments
            .iter()
            .find(|arg| arg.name == name)
            .map(BuildArgument::value)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, id: StageId) -> Option<&Stage> {
        self.stages.get(id.0)
    }

    pub fn lookup(&self, reference: &StageRef) -> Option<StageId> {
        match reference {
            StageRef::Name(name) => self
                .stages
                .iter()
                .find(|stage| stage.name.as_deref() == Some(name.as_str()))
                .map(|stage| stage.id),
            StageRef::Index(index) => self.stages.get(*index).map(|stage| stage.id),
        }
    }

    /// Rendering never produces an empty plan, so there is always a final stage.
    pub fn final_stage(&self) -> &Stage {
        &self.stages[self.stages.len() - 1]
    }

    /// Walk the base chain of `id` back to its external image and fold the
    /// instructions forward.
    pub fn effective_config(&self, id: StageId) -> Option<ImageConfig> {
        let mut chain = vec![self.stage(id)?];
        loop {
            let current = chain[chain.len() - 1];
            match &current.base {
                Base::Image(_) => break,
                Base::Stage(reference) => {
                    let parent = self.lookup(reference)?;
                    // Bases always point backwards; anything else is not a rendered plan
                    if parent >= current.id {
                        return None;
                    }
                    chain.push(self.stage(parent)?);
                }
            }
        }

        let mut config = ImageConfig::default();
        for stage in chain.iter().rev() {
            if let Base::Image(image) = &stage.base {
                config.base_image = image.clone();
            }
            config.apply(&stage.instructions);
        }
        Some(config)
    }

    pub fn final_config(&self) -> ImageConfig {
        self.effective_config(self.final_stage().id)
            .unwrap_or_default()
    }

    /// Content digest over the canonical JSON encoding of the plan
    pub fn digest(&self) -> Result<String> {
        let encoded = serde_json::to_vec(self).context("Failed to encode build plan")?;
        Ok(format!("sha256:{}", hex::encode(Sha256::digest(&encoded))))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize build plan to JSON")
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize build plan to YAML")
    }
}

fn describe_base(base: &Base) -> String {
    match base {
        Base::Image(image) => image.clone(),
        Base::Stage(reference) => format!("stage {}", reference),
    }
}

impl fmt::Display for BuildPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Build Plan")?;
        writeln!(f, "==========")?;

        if !self.arguments.is_empty() {
            writeln!(f, "Arguments:")?;
            for arg in &self.arguments {
                writeln!(f, "  {} = {}", arg.name, arg.value())?;
            }
            writeln!(f)?;
        }

        for stage in &self.stages {
            writeln!(f, "Stage {} ({}):", stage.id, stage.label())?;
            writeln!(f, "  Base: {}", describe_base(&stage.base))?;
            for transfer in stage.transfers() {
                writeln!(
                    f,
                    "  Transfer: {}:{} -> {}",
                    transfer.source,
                    transfer.source_paths.join(" "),
                    transfer.destination_path
                )?;
            }
            writeln!(f, "  Instructions: {}", stage.instructions.len())?;
            writeln!(f)?;
        }

        let config = self.final_config();
        writeln!(f, "Runtime:")?;
        match &config.user {
            Some(user) => writeln!(f, "  User:       {}", user)?,
            None => writeln!(f, "  User:       (default)")?,
        }
        if !config.exposed_ports.is_empty() {
            writeln!(f, "  Ports:      {}", config.exposed_ports.join(", "))?;
        }
        if let Some(entrypoint) = &config.entrypoint {
            writeln!(f, "  Entrypoint: {}", entrypoint.join(" "))?;
        }
        if let Some(cmd) = &config.cmd {
            writeln!(f, "  Command:    {}", cmd.join(" "))?;
        }
        Ok(())
    }
}
