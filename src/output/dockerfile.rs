//! Dockerfile emission
//!
//! `emit_template` writes a parameterized Dockerfile with its `ARG` block and
//! unsubstituted tokens. `emit_plan` writes a rendered plan with every value
//! already resolved.
//!
//! The build engine expands `${...}` itself on most instructions, so a
//! rendered value that still spells `${X}` is written as `\${X}` there.
//! `RUN`, raw lines and exec-form `ENTRYPOINT`/`CMD` are not expanded by the
//! engine and are written as they are.

use crate::plan::{
    ArgumentRegistry, Base, BuildArgument, BuildPlan, Instruction, Stage, StageGraph, StageRef,
};
use std::collections::BTreeSet;
use std::fmt::Write;

/// Emit a parameterized Dockerfile for `graph`, declaring every argument in
/// `registry` up front.
pub fn emit_template(graph: &StageGraph, registry: &ArgumentRegistry) -> String {
    let mut out = String::new();
    write_arguments(&mut out, registry.iter());
    write_stages(&mut out, graph.stages(), Text::Template);
    out
}

/// Emit a rendered plan. Arguments are already substituted, so no `ARG`
/// lines are written.
pub fn emit_plan(plan: &BuildPlan) -> String {
    let mut out = String::new();
    write_stages(&mut out, plan.stages(), Text::Resolved);
    out
}

/// How operand text is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Text {
    /// Tokens are live references
    Template,
    /// Any `${` left is literal and must survive the engine's own expansion
    Resolved,
}

impl Text {
    fn expanded(self, value: &str) -> String {
        match self {
            Text::Template => value.to_string(),
            Text::Resolved => value.replace("${", "\\${"),
        }
    }
}

fn write_arguments<'a>(out: &mut String, arguments: impl Iterator<Item = &'a BuildArgument>) {
    let mut any = false;
    for argument in arguments {
        any = true;
        if argument.default.is_empty() {
            let _ = writeln!(out, "ARG {}", argument.name);
        } else {
            let _ = writeln!(out, "ARG {}={}", argument.name, argument.default);
        }
    }
    if any {
        out.push('\n');
    }
}

fn write_stages(out: &mut String, stages: &[Stage], text: Text) {
    let aliased = aliased_stages(stages);

    for (position, stage) in stages.iter().enumerate() {
        if position > 0 {
            out.push('\n');
        }

        let base = match &stage.base {
            Base::Image(image) => text.expanded(image),
            Base::Stage(reference) => stage_alias(stages, reference),
        };
        let _ = match (&stage.name, aliased.contains(&stage.id.index())) {
            (Some(name), _) => writeln!(out, "FROM {} AS {}", base, name),
            (None, true) => writeln!(out, "FROM {} AS stage-{}", base, stage.id),
            (None, false) => writeln!(out, "FROM {}", base),
        };

        let mut previous: Option<&Instruction> = None;
        for instruction in &stage.instructions {
            if !previous.is_some_and(|prev| attaches_to(instruction, prev)) {
                out.push('\n');
            }
            out.push_str(&write_instruction(instruction, text));
            out.push('\n');
            previous = Some(instruction);
        }
    }
}

/// Unnamed stages that a later `FROM` points at need an alias, since `FROM`
/// cannot address a stage by position.
fn aliased_stages(stages: &[Stage]) -> BTreeSet<usize> {
    stages
        .iter()
        .filter_map(|stage| match &stage.base {
            Base::Stage(StageRef::Index(index)) => Some(*index),
            _ => None,
        })
        .filter(|index| stages.get(*index).is_some_and(|s| s.name.is_none()))
        .collect()
}

fn stage_alias(stages: &[Stage], reference: &StageRef) -> String {
    match reference {
        StageRef::Name(name) => name.clone(),
        StageRef::Index(index) => match stages.get(*index).and_then(|s| s.name.as_ref()) {
            Some(name) => name.clone(),
            None => format!("stage-{}", index),
        },
    }
}

/// Whether `current` continues the block started by `previous` rather than
/// opening a new paragraph.
fn attaches_to(current: &Instruction, previous: &Instruction) -> bool {
    use Instruction::*;
    matches!(
        (previous, current),
        (Copy { .. } | Transfer(_) | Run(_), Run(_))
            | (CreateUser(_), User(_))
            | (Env { .. }, Env { .. })
            | (Label { .. }, Label { .. })
            | (Expose(_), Expose(_))
            | (Entrypoint(_), Cmd(_))
    )
}

/// Dockerfile line for one instruction, with its operands written as given
pub fn instruction_line(instruction: &Instruction) -> String {
    write_instruction(instruction, Text::Template)
}

fn write_instruction(instruction: &Instruction, text: Text) -> String {
    let paths = |paths: &[String]| {
        paths
            .iter()
            .map(|path| text.expanded(path))
            .collect::<Vec<_>>()
            .join(" ")
    };

    match instruction {
        Instruction::Workdir(path) => format!("WORKDIR {}", text.expanded(path)),
        Instruction::Copy {
            sources,
            destination,
        } => format!("COPY {} {}", paths(sources.as_slice()), text.expanded(destination)),
        Instruction::Transfer(transfer) => format!(
            "COPY --from={} {} {}",
            transfer.source,
            paths(transfer.source_paths.as_slice()),
            text.expanded(&transfer.destination_path)
        ),
        Instruction::Run(command) => format!("RUN {}", command),
        Instruction::Env { key, value } => {
            format!("ENV {}={}", key, text.expanded(&quote_value(value)))
        }
        Instruction::Label { key, value } => {
            format!("LABEL {}={}", key, text.expanded(&quote_value(value)))
        }
        Instruction::CreateUser(user) => {
            let group = user.group.as_deref().unwrap_or(&user.user);
            format!(
                "RUN addgroup -S {} && adduser -S {} -G {}",
                group, user.user, group
            )
        }
        Instruction::User(user) => format!("USER {}", text.expanded(&user.to_string())),
        Instruction::Expose(port) => format!("EXPOSE {}", text.expanded(port)),
        Instruction::Entrypoint(args) => format!("ENTRYPOINT {}", exec_form(args)),
        Instruction::Cmd(args) => format!("CMD {}", exec_form(args)),
        Instruction::Raw(text) => text.clone(),
    }
}

fn exec_form(args: &[String]) -> String {
    let quoted: Vec<String> = args
        .iter()
        .map(|arg| serde_json::Value::String(arg.clone()).to_string())
        .collect();
    format!("[{}]", quoted.join(","))
}

/// Double-quote values with whitespace or quotes. A backslash in front of
/// `$` is kept as the escape it is.
fn quote_value(value: &str) -> String {
    if !value.is_empty() && !value.chars().any(|c| c.is_whitespace() || c == '"') {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' if chars.peek() != Some(&'$') => quoted.push_str("\\\\"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
