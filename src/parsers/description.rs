//! YAML / JSON plan descriptions
//!
//! ```yaml
//! arguments:
//!   - name: GO_VERSION
//!     default: "1.22"
//! stages:
//!   - name: builder
//!     from: { image: "golang:${GO_VERSION}-alpine" }
//!     workdir: /src
//!     instructions:
//!       - copy: { sources: ["."], destination: "." }
//!       - run: go build -o /out/app ./...
//!   - from: { image: alpine:3.19 }
//!     instructions:
//!       - copy_from: { stage: builder, source: /out/app, destination: /app/server }
//!       - create_user: { user: app }
//!       - user: app
//!       - expose: 8080
//!       - entrypoint: ["/app/server"]
//! ```

use super::{ParseError, PlanDefinition};
use crate::plan::{
    ArgumentRegistry, ArtifactTransfer, Base, Instruction, RuntimeUser, StageGraph, StageRef,
};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use tracing::debug;

fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionFormat {
    Yaml,
    Json,
}

impl DescriptionFormat {
    /// `.json` files are JSON, everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DescriptionFormat::Json,
            _ => DescriptionFormat::Yaml,
        }
    }
}

/// YAML scalars may arrive as numbers (`default: 8080`); keep their text.
///
/// Floats are refused: `1.10` would come back as `1.1`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Scalar {
    fn into_text(self, location: &str) -> Result<String, ParseError> {
        match self {
            Scalar::Integer(value) => Ok(value.to_string()),
            Scalar::Bool(value) => Ok(value.to_string()),
            Scalar::Text(value) => Ok(value),
            Scalar::Float(value) => Err(invalid(
                location,
                &format!(
                    "the number {} loses its original digits; quote the value to keep it as written",
                    value
                ),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Description {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    arguments: Vec<ArgumentSpec>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    stages: Vec<StageSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArgumentSpec {
    name: String,
    #[serde(default)]
    default: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StageSpec {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    from: Option<FromSpec>,
    #[serde(default)]
    workdir: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    instructions: Vec<InstructionSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FromSpec {
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    stage: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CopySpec {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    sources: Vec<String>,
    #[serde(default)]
    source: Option<String>,
    destination: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TransferSpec {
    stage: Scalar,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    sources: Vec<String>,
    #[serde(default)]
    source: Option<String>,
    destination: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KeyValueSpec {
    key: String,
    value: Scalar,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UserSpec {
    user: String,
    #[serde(default)]
    group: Option<String>,
}

/// One instruction: exactly one of the fields must be set.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InstructionSpec {
    run: Option<String>,
    copy: Option<CopySpec>,
    copy_from: Option<TransferSpec>,
    env: Option<KeyValueSpec>,
    label: Option<KeyValueSpec>,
    user: Option<String>,
    create_user: Option<UserSpec>,
    expose: Option<Scalar>,
    entrypoint: Option<Vec<String>>,
    cmd: Option<Vec<String>>,
    workdir: Option<String>,
    raw: Option<String>,
}

impl InstructionSpec {
    fn into_instruction(self, location: &str) -> Result<Instruction, ParseError> {
        let mut converted: Vec<Instruction> = Vec::new();

        if let Some(command) = self.run {
            converted.push(Instruction::Run(command));
        }
        if let Some(copy) = self.copy {
            let mut sources = copy.sources;
            sources.extend(copy.source);
            if sources.is_empty() {
                return Err(invalid(location, "copy needs at least one source"));
            }
            converted.push(Instruction::Copy {
                sources,
                destination: copy.destination,
            });
        }
        if let Some(transfer) = self.copy_from {
            let mut sources = transfer.sources;
            sources.extend(transfer.source);
            if sources.is_empty() {
                return Err(invalid(location, "copy_from needs at least one source"));
            }
            converted.push(Instruction::Transfer(ArtifactTransfer::with_sources(
                stage_ref(transfer.stage, location)?,
                sources,
                transfer.destination,
            )));
        }
        if let Some(env) = self.env {
            converted.push(Instruction::env(env.key, env.value.into_text(location)?));
        }
        if let Some(label) = self.label {
            converted.push(Instruction::Label {
                key: label.key,
                value: label.value.into_text(location)?,
            });
        }
        if let Some(user) = self.user {
            converted.push(Instruction::User(RuntimeUser::parse(&user)));
        }
        if let Some(spec) = self.create_user {
            let user = RuntimeUser::new(spec.user);
            let user = match spec.group {
                Some(group) => user.with_group(group),
                None => user,
            };
            converted.push(Instruction::CreateUser(user));
        }
        if let Some(port) = self.expose {
            converted.push(Instruction::Expose(port.into_text(location)?));
        }
        if let Some(args) = self.entrypoint {
            converted.push(Instruction::Entrypoint(args));
        }
        if let Some(args) = self.cmd {
            converted.push(Instruction::Cmd(args));
        }
        if let Some(path) = self.workdir {
            converted.push(Instruction::Workdir(path));
        }
        if let Some(text) = self.raw {
            converted.push(Instruction::Raw(text));
        }

        match converted.len() {
            1 => Ok(converted.remove(0)),
            0 => Err(invalid(location, "instruction is empty")),
            n => Err(invalid(
                location,
                &format!("instruction sets {} kinds at once; expected exactly one", n),
            )),
        }
    }
}

fn invalid(location: &str, message: &str) -> ParseError {
    ParseError::InvalidDescription {
        location: location.to_string(),
        message: message.to_string(),
    }
}

fn stage_ref(scalar: Scalar, location: &str) -> Result<StageRef, ParseError> {
    match scalar {
        Scalar::Integer(index) if index >= 0 => Ok(StageRef::Index(index as usize)),
        other => other.into_text(location).map(StageRef::Name),
    }
}

/// Parse a plan description in the given format.
pub fn parse_description(
    content: &str,
    format: DescriptionFormat,
) -> Result<PlanDefinition, ParseError> {
    let description: Description = match format {
        DescriptionFormat::Yaml => serde_yaml::from_str(content).map_err(|e| {
            invalid("document", &e.to_string())
        })?,
        DescriptionFormat::Json => serde_json::from_str(content).map_err(|e| {
            invalid("document", &e.to_string())
        })?,
    };
    build(description)
}

fn build(description: Description) -> Result<PlanDefinition, ParseError> {
    let mut arguments = ArgumentRegistry::new();
    for (index, spec) in description.arguments.into_iter().enumerate() {
        let location = format!("arguments[{}]", index);
        let default = match spec.default {
            Some(default) => default.into_text(&location)?,
            None => String::new(),
        };
        arguments
            .declare(spec.name, default)
            .map_err(|source| ParseError::DescriptionPlan { location, source })?;
    }

    let mut graph = StageGraph::new();
    for (index, spec) in description.stages.into_iter().enumerate() {
        let location = format!("stages[{}]", index);

        let base = match spec.from {
            Some(FromSpec {
                image: Some(image),
                stage: None,
            }) => Base::Image(image),
            Some(FromSpec {
                image: None,
                stage: Some(stage),
            }) => Base::Stage(stage_ref(stage, &location)?),
            _ => {
                return Err(invalid(
                    &location,
                    "'from' needs exactly one of 'image' or 'stage'",
                ))
            }
        };

        let mut instructions = Vec::with_capacity(spec.instructions.len() + 1);
        if let Some(workdir) = spec.workdir {
            instructions.push(Instruction::Workdir(workdir));
        }
        for (position, instruction) in spec.instructions.into_iter().enumerate() {
            let location = format!("{}.instructions[{}]", location, position);
            instructions.push(instruction.into_instruction(&location)?);
        }

        graph
            .add_stage(spec.name.as_deref(), base, instructions)
            .map_err(|source| ParseError::DescriptionPlan {
                location: location.clone(),
                source,
            })?;
    }

    debug!(
        stages = graph.len(),
        arguments = arguments.len(),
        "Parsed plan description"
    );
    Ok(PlanDefinition { arguments, graph })
}
