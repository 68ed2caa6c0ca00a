//! Stages and their instructions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a stage inside its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(pub usize);

impl StageId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How another stage is addressed: by name or by zero-based position
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRef {
    Name(String),
    Index(usize),
}

impl StageRef {
    pub fn name(name: impl Into<String>) -> Self {
        StageRef::Name(name.into())
    }
}

impl fmt::Display for StageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageRef::Name(name) => write!(f, "{}", name),
            StageRef::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Where a stage starts from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Base {
    /// External base environment, e.g. `eclipse-temurin:${JAVA_VERSION}-jre-alpine`
    Image(String),
    /// Output of an earlier stage
    Stage(StageRef),
}

impl Base {
    pub fn image(reference: impl Into<String>) -> Self {
        Base::Image(reference.into())
    }

    pub fn stage(name: impl Into<String>) -> Self {
        Base::Stage(StageRef::Name(name.into()))
    }
}

/// Identity the entry process runs as
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuntimeUser {
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl RuntimeUser {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Parse `user` or `user:group`.
    pub fn parse(spec: &str) -> Self {
        match spec.split_once(':') {
            Some((user, group)) => Self::new(user).with_group(group),
            None => Self::new(spec),
        }
    }

    /// `root` or uid `0` is the privileged default identity.
    pub fn is_privileged(&self) -> bool {
        let user = self.user.trim();
        user.is_empty() || user == "root" || user == "0"
    }
}

impl fmt::Display for RuntimeUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}:{}", self.user, group),
            None => write!(f, "{}", self.user),
        }
    }
}

/// Copy of paths produced by an earlier stage into the current one
///
/// Several source paths land together in one destination, the way a single
/// `COPY --from` with many sources does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactTransfer {
    pub source: StageRef,
    pub source_paths: Vec<String>,
    pub destination_path: String,
}

impl ArtifactTransfer {
    pub fn new(
        source: StageRef,
        source_path: impl Into<String>,
        destination_path: impl Into<String>,
    ) -> Self {
        Self::with_sources(source, vec![source_path.into()], destination_path)
    }

    pub fn with_sources(
        source: StageRef,
        source_paths: Vec<String>,
        destination_path: impl Into<String>,
    ) -> Self {
        Self {
            source,
            source_paths,
            destination_path: destination_path.into(),
        }
    }
}

/// One build step inside a stage
///
/// `Run` and `Raw` are opaque to the planner. Transfers are structured so
/// their provenance can be checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instruction {
    Workdir(String),
    /// Copy from the build context
    Copy {
        sources: Vec<String>,
        destination: String,
    },
    Transfer(ArtifactTransfer),
    Run(String),
    Env {
        key: String,
        value: String,
    },
    Label {
        key: String,
        value: String,
    },
    /// Create a system group and user inside the stage
    CreateUser(RuntimeUser),
    /// Switch the identity subsequent steps and the entry process run as
    User(RuntimeUser),
    Expose(String),
    Entrypoint(Vec<String>),
    Cmd(Vec<String>),
    Raw(String),
}

impl Instruction {
    pub fn run(command: impl Into<String>) -> Self {
        Instruction::Run(command.into())
    }

    pub fn workdir(path: impl Into<String>) -> Self {
        Instruction::Workdir(path.into())
    }

    pub fn copy(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Instruction::Copy {
            sources: vec![source.into()],
            destination: destination.into(),
        }
    }

    pub fn transfer(
        source_stage: impl Into<String>,
        source_path: impl Into<String>,
        destination_path: impl Into<String>,
    ) -> Self {
        Instruction::Transfer(ArtifactTransfer::new(
            StageRef::Name(source_stage.into()),
            source_path,
            destination_path,
        ))
    }

    pub fn env(key: impl Into<String>, value: impl Into<String>) -> Self {
        Instruction::Env {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn expose(port: impl Into<String>) -> Self {
        Instruction::Expose(port.into())
    }

    pub fn user(spec: &str) -> Self {
        Instruction::User(RuntimeUser::parse(spec))
    }

    pub fn entrypoint<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Instruction::Entrypoint(args.into_iter().map(Into::into).collect())
    }

    pub fn cmd<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Instruction::Cmd(args.into_iter().map(Into::into).collect())
    }

    pub fn as_transfer(&self) -> Option<&ArtifactTransfer> {
        match self {
            Instruction::Transfer(transfer) => Some(transfer),
            _ => None,
        }
    }

    pub fn is_transfer(&self) -> bool {
        self.as_transfer().is_some()
    }

    /// Apply `f` to every string that may carry argument references.
    ///
    /// Keys of `ENV`/`LABEL` and stage references are left alone.
    pub fn try_map_text<E, F>(&self, mut f: F) -> Result<Instruction, E>
    where
        F: FnMut(&str) -> Result<String, E>,
    {
        let mapped = match self {
            Instruction::Workdir(path) => Instruction::Workdir(f(path)?),
            Instruction::Copy {
                sources,
                destination,
            } => Instruction::Copy {
                sources: sources.iter().map(|s| f(s)).collect::<Result<_, _>>()?,
                destination: f(destination)?,
            },
            Instruction::Transfer(transfer) => Instruction::Transfer(ArtifactTransfer {
                source: transfer.source.clone(),
                source_paths: transfer
                    .source_paths
                    .iter()
                    .map(|p| f(p))
                    .collect::<Result<_, _>>()?,
                destination_path: f(&transfer.destination_path)?,
            }),
            Instruction::Run(command) => Instruction::Run(f(command)?),
            Instruction::Env { key, value } => Instruction::Env {
                key: key.clone(),
                value: f(value)?,
            },
            Instruction::Label { key, value } => Instruction::Label {
                key: key.clone(),
                value: f(value)?,
            },
            Instruction::CreateUser(user) => Instruction::CreateUser(map_user(user, &mut f)?),
            Instruction::User(user) => Instruction::User(map_user(user, &mut f)?),
            Instruction::Expose(port) => Instruction::Expose(f(port)?),
            Instruction::Entrypoint(args) => {
                Instruction::Entrypoint(args.iter().map(|a| f(a)).collect::<Result<_, _>>()?)
            }
            Instruction::Cmd(args) => {
                Instruction::Cmd(args.iter().map(|a| f(a)).collect::<Result<_, _>>()?)
            }
            Instruction::Raw(text) => Instruction::Raw(f(text)?),
        };
        Ok(mapped)
    }
}

fn map_user<E, F>(user: &RuntimeUser, f: &mut F) -> Result<RuntimeUser, E>
where
    F: FnMut(&str) -> Result<String, E>,
{
    Ok(RuntimeUser {
        user: f(&user.user)?,
        group: user.group.as_deref().map(|g| f(g)).transpose()?,
    })
}

/// One isolated build step with its own base environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub base: Base,
    pub instructions: Vec<Instruction>,
}

impl Stage {
    /// Name if the stage has one, otherwise its position
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.id.to_string(),
        }
    }

    pub fn transfers(&self) -> impl Iterator<Item = &ArtifactTransfer> {
        self.instructions.iter().filter_map(Instruction::as_transfer)
    }
}
