//! Built-in parameterized templates, one per build type
//!
//! Every template declares its arguments with defaults and a builder stage
//! followed by a runtime stage. The runtime stage runs as a non-root user,
//! exposes `${APP_PORT}` and sets an entry command.

mod go;
mod java;
mod node;
mod php;
mod python;

use crate::parsers::PlanDefinition;
use crate::plan::{ArgumentRegistry, Base, Instruction, PlanError, StageGraph};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use go::GoTemplate;
pub use java::{GradleTemplate, MavenTemplate};
pub use node::{NodePageTemplate, NodeServiceTemplate};
pub use php::PhpTemplate;
pub use python::PythonTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildType {
    Go,
    Java,
    JavaGradle,
    NodePage,
    NodeService,
    Php,
    Python,
}

impl BuildType {
    pub fn all() -> &'static [BuildType] {
        &[
            BuildType::Go,
            BuildType::Java,
            BuildType::JavaGradle,
            BuildType::NodePage,
            BuildType::NodeService,
            BuildType::Php,
            BuildType::Python,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            BuildType::Go => "go",
            BuildType::Java => "java",
            BuildType::JavaGradle => "java-gradle",
            BuildType::NodePage => "node-page",
            BuildType::NodeService => "node-service",
            BuildType::Php => "php",
            BuildType::Python => "python",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|build_type| build_type.name() == name)
    }

    fn valid_names() -> String {
        Self::all()
            .iter()
            .map(|build_type| build_type.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for BuildType {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| TemplateError::UnknownBuildType {
            name: s.to_string(),
            valid: Self::valid_names(),
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unknown build type '{name}'. Valid options: {valid}")]
    UnknownBuildType { name: String, valid: String },

    #[error("Template '{build_type}' is inconsistent: {source}")]
    Inconsistent {
        build_type: BuildType,
        #[source]
        source: PlanError,
    },
}

/// One stage of a template
pub struct TemplateStage {
    pub name: Option<&'static str>,
    pub base: Base,
    pub instructions: Vec<Instruction>,
}

impl TemplateStage {
    pub fn named(name: &'static str, image: &str, instructions: Vec<Instruction>) -> Self {
        Self {
            name: Some(name),
            base: Base::image(image),
            instructions,
        }
    }

    pub fn unnamed(image: &str, instructions: Vec<Instruction>) -> Self {
        Self {
            name: None,
            base: Base::image(image),
            instructions,
        }
    }
}

pub trait BuildTemplate: Send + Sync {
    fn build_type(&self) -> BuildType;

    fn description(&self) -> &'static str;

    /// Declared arguments as `(name, default)`, in declaration order
    fn arguments(&self) -> &'static [(&'static str, &'static str)];

    fn stages(&self) -> Vec<TemplateStage>;

    fn definition(&self) -> Result<PlanDefinition, TemplateError> {
        let inconsistent = |source| TemplateError::Inconsistent {
            build_type: self.build_type(),
            source,
        };

        let arguments =
            ArgumentRegistry::from_pairs(self.arguments().iter().copied()).map_err(inconsistent)?;
        let mut graph = StageGraph::new();
        for stage in self.stages() {
            graph
                .add_stage(stage.name, stage.base, stage.instructions)
                .map_err(inconsistent)?;
        }
        Ok(PlanDefinition::new(arguments, graph))
    }
}

pub struct TemplateRegistry {
    templates: HashMap<BuildType, Box<dyn BuildTemplate>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for build_type in BuildType::all() {
            let template: Box<dyn BuildTemplate> = match build_type {
                BuildType::Go => Box::new(GoTemplate),
                BuildType::Java => Box::new(MavenTemplate),
                BuildType::JavaGradle => Box::new(GradleTemplate),
                BuildType::NodePage => Box::new(NodePageTemplate),
                BuildType::NodeService => Box::new(NodeServiceTemplate),
                BuildType::Php => Box::new(PhpTemplate),
                BuildType::Python => Box::new(PythonTemplate),
            };
            registry.register(template);
        }
        registry
    }

    pub fn register(&mut self, template: Box<dyn BuildTemplate>) {
        self.templates.insert(template.build_type(), template);
    }

    pub fn get(&self, build_type: BuildType) -> Option<&dyn BuildTemplate> {
        self.templates.get(&build_type).map(|t| t.as_ref())
    }

    /// Look a template up by build type name.
    pub fn resolve(&self, name: &str) -> Result<&dyn BuildTemplate, TemplateError> {
        let build_type = name.parse::<BuildType>()?;
        self.get(build_type)
            .ok_or_else(|| TemplateError::UnknownBuildType {
                name: name.to_string(),
                valid: BuildType::valid_names(),
            })
    }

    /// Registered templates, sorted by build type
    pub fn iter(&self) -> impl Iterator<Item = &dyn BuildTemplate> {
        let mut templates: Vec<&dyn BuildTemplate> =
            self.templates.values().map(|t| t.as_ref()).collect();
        templates.sort_by_key(|t| t.build_type());
        templates.into_iter()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Runtime-stage tail shared by the templates: create the user, switch to
/// it, expose the port and set the entry command.
pub(crate) fn runtime_tail(user: &str, entry: Instruction) -> Vec<Instruction> {
    vec![
        Instruction::CreateUser(crate::plan::RuntimeUser::new(user).with_group(user)),
        Instruction::user(user),
        Instruction::expose("${APP_PORT}"),
        entry,
    ]
}
