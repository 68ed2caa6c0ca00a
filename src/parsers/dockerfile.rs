//! Parameterized Dockerfile parsing

use super::{ParseError, PlanDefinition};
use crate::plan::{
    ArgumentRegistry, ArtifactTransfer, Base, Instruction, RuntimeUser, StageGraph, StageRef,
};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

struct LogicalLine {
    number: usize,
    text: String,
}

struct PendingStage {
    line: usize,
    name: Option<String>,
    base: Base,
    instructions: Vec<Instruction>,
}

/// Parse a Dockerfile into its declared arguments and stage graph.
pub fn parse(content: &str) -> Result<PlanDefinition, ParseError> {
    let lines = logical_lines(content);
    let stage_names = collect_stage_names(&lines);

    let mut arguments = ArgumentRegistry::new();
    let mut graph = StageGraph::new();
    let mut current: Option<PendingStage> = None;

    for line in &lines {
        let (keyword, rest) = split_keyword(&line.text);

        match keyword.as_str() {
            "ARG" => declare_arguments(&mut arguments, rest, current.is_some(), line.number)?,
            "FROM" => {
                if let Some(stage) = current.take() {
                    finish_stage(&mut graph, stage)?;
                }
                current = Some(parse_from(rest, &stage_names, line.number)?);
            }
            _ => {
                let stage = current.as_mut().ok_or_else(|| ParseError::InstructionBeforeFrom {
                    line: line.number,
                    keyword: keyword.clone(),
                })?;
                let instructions = parse_instruction(&keyword, rest, &line.text, line.number)?;
                stage.instructions.extend(instructions);
            }
        }
    }

    if let Some(stage) = current.take() {
        finish_stage(&mut graph, stage)?;
    }

    debug!(
        stages = graph.len(),
        arguments = arguments.len(),
        "Parsed Dockerfile"
    );
    Ok(PlanDefinition { arguments, graph })
}

/// Join `\` continuations and drop comments and blank lines.
fn logical_lines(content: &str) -> Vec<LogicalLine> {
    let mut lines = Vec::new();
    let mut pending: Option<LogicalLine> = None;

    for (index, raw) in content.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (body, continues) = match trimmed.strip_suffix('\\') {
            Some(body) => (body.trim_end(), true),
            None => (trimmed, false),
        };

        let entry = pending.get_or_insert_with(|| LogicalLine {
            number: index + 1,
            text: String::new(),
        });
        if !entry.text.is_empty() && !body.is_empty() {
            entry.text.push(' ');
        }
        entry.text.push_str(body);

        if !continues {
            if let Some(line) = pending.take() {
                lines.push(line);
            }
        }
    }

    if let Some(line) = pending.take() {
        if !line.text.is_empty() {
            lines.push(line);
        }
    }

    lines
}

fn split_keyword(text: &str) -> (String, &str) {
    match text.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword.to_ascii_uppercase(), rest.trim()),
        None => (text.to_ascii_uppercase(), ""),
    }
}

fn collect_stage_names(lines: &[LogicalLine]) -> HashSet<String> {
    lines
        .iter()
        .filter_map(|line| {
            let (keyword, rest) = split_keyword(&line.text);
            if keyword != "FROM" {
                return None;
            }
            let words: Vec<&str> = rest
                .split_whitespace()
                .filter(|word| !word.starts_with("--"))
                .collect();
            match words.as_slice() {
                [_, alias, name] if alias.eq_ignore_ascii_case("as") => Some(name.to_string()),
                _ => None,
            }
        })
        .collect()
}

fn declare_arguments(
    registry: &mut ArgumentRegistry,
    rest: &str,
    in_stage: bool,
    line: usize,
) -> Result<(), ParseError> {
    if rest.is_empty() {
        return Err(ParseError::missing_operand(line, "ARG"));
    }

    for word in split_words(rest) {
        let result = match word.split_once('=') {
            Some((name, default)) => registry.declare(name, default),
            // A bare ARG inside a stage imports a global declaration
            None if in_stage && registry.contains(&word) => Ok(()),
            None => registry.declare(word, ""),
        };
        result.map_err(|source| ParseError::Plan { line, source })?;
    }
    Ok(())
}

fn parse_from(
    rest: &str,
    stage_names: &HashSet<String>,
    line: usize,
) -> Result<PendingStage, ParseError> {
    let words: Vec<&str> = rest
        .split_whitespace()
        .filter(|word| !word.starts_with("--"))
        .collect();

    let (reference, name) = match words.as_slice() {
        [reference] => (*reference, None),
        [reference, alias, name] if alias.eq_ignore_ascii_case("as") => {
            (*reference, Some(name.to_string()))
        }
        [] => return Err(ParseError::missing_operand(line, "FROM")),
        _ => {
            return Err(ParseError::InvalidSyntax {
                line,
                message: format!("expected 'FROM <base> [AS <name>]', got 'FROM {}'", rest),
            })
        }
    };

    let base = if stage_names.contains(reference) {
        Base::stage(reference)
    } else {
        Base::image(reference)
    };

    Ok(PendingStage {
        line,
        name,
        base,
        instructions: Vec::new(),
    })
}

fn finish_stage(graph: &mut StageGraph, stage: PendingStage) -> Result<(), ParseError> {
    graph
        .add_stage(stage.name.as_deref(), stage.base, stage.instructions)
        .map(|_| ())
        .map_err(|source| ParseError::Plan {
            line: stage.line,
            source,
        })
}

fn parse_instruction(
    keyword: &str,
    rest: &str,
    original: &str,
    line: usize,
) -> Result<Vec<Instruction>, ParseError> {
    if is_structured(keyword) && rest.is_empty() {
        return Err(ParseError::missing_operand(line, keyword));
    }

    let instructions = match keyword {
        "RUN" => vec![parse_run(rest)],
        "WORKDIR" => vec![Instruction::workdir(rest)],
        "COPY" => parse_copy(rest, original, line)?,
        "ENV" => parse_pairs(rest, line, "ENV", Instruction::env)?,
        "LABEL" => parse_pairs(rest, line, "LABEL", |key, value| Instruction::Label {
            key,
            value,
        })?,
        "USER" => vec![Instruction::User(RuntimeUser::parse(rest))],
        "EXPOSE" => rest.split_whitespace().map(Instruction::expose).collect(),
        "ENTRYPOINT" => vec![Instruction::Entrypoint(command_form(rest, line, keyword)?)],
        "CMD" => vec![Instruction::Cmd(command_form(rest, line, keyword)?)],
        _ => vec![Instruction::Raw(original.to_string())],
    };
    Ok(instructions)
}

fn is_structured(keyword: &str) -> bool {
    matches!(
        keyword,
        "RUN" | "WORKDIR" | "COPY" | "ENV" | "LABEL" | "USER" | "EXPOSE" | "ENTRYPOINT" | "CMD"
    )
}

fn create_user_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^addgroup -S (\S+) && adduser -S (\S+) -G (\S+)$").expect("valid regex")
    })
}

/// The Alpine user-creation idiom becomes a structured instruction.
fn parse_run(command: &str) -> Instruction {
    if let Some(caps) = create_user_regex().captures(command) {
        if caps[1] == caps[3] {
            return Instruction::CreateUser(RuntimeUser::new(&caps[2]).with_group(&caps[1]));
        }
    }
    Instruction::run(command)
}

fn parse_copy(rest: &str, original: &str, line: usize) -> Result<Vec<Instruction>, ParseError> {
    let mut from = None;
    let mut other_flags = false;
    let mut paths = Vec::new();

    for word in rest.split_whitespace() {
        if let Some(source) = word.strip_prefix("--from=") {
            from = Some(source);
        } else if word.starts_with("--") {
            other_flags = true;
        } else {
            paths.push(word.to_string());
        }
    }

    if paths.len() < 2 {
        return Err(ParseError::missing_operand(line, "COPY"));
    }
    let destination = paths.pop().unwrap_or_default();

    let Some(source) = from else {
        // Ownership and permission flags are not modelled; keep the line verbatim
        if other_flags {
            return Ok(vec![Instruction::Raw(original.to_string())]);
        }
        return Ok(vec![Instruction::Copy {
            sources: paths,
            destination,
        }]);
    };

    if other_flags {
        debug!(line, "Ignoring COPY flags other than --from");
    }

    let source = match source.parse::<usize>() {
        Ok(index) => StageRef::Index(index),
        Err(_) => StageRef::name(source),
    };

    if paths.len() > 1 && !destination.ends_with('/') {
        return Err(ParseError::InvalidSyntax {
            line,
            message: format!(
                "COPY with several sources needs a directory destination ending in '/', got '{}'",
                destination
            ),
        });
    }

    Ok(vec![Instruction::Transfer(ArtifactTransfer::with_sources(
        source,
        paths,
        destination,
    ))])
}

fn parse_pairs<F>(
    rest: &str,
    line: usize,
    keyword: &str,
    build: F,
) -> Result<Vec<Instruction>, ParseError>
where
    F: Fn(String, String) -> Instruction,
{
    let first = rest.split_whitespace().next().unwrap_or_default();

    // Legacy form: `ENV KEY value with spaces`
    if !first.contains('=') {
        let value = rest[first.len()..].trim();
        if value.is_empty() {
            return Err(ParseError::missing_operand(line, keyword));
        }
        return Ok(vec![build(first.to_string(), value.to_string())]);
    }

    split_words(rest)
        .into_iter()
        .map(|word| match word.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok(build(key.to_string(), value.to_string())),
            _ => Err(ParseError::InvalidSyntax {
                line,
                message: format!("expected KEY=VALUE in {}, got '{}'", keyword, word),
            }),
        })
        .collect()
}

/// Exec form (`["a","b"]`) or shell form wrapped in `/bin/sh -c`.
fn command_form(rest: &str, line: usize, keyword: &str) -> Result<Vec<String>, ParseError> {
    if rest.starts_with('[') {
        return serde_json::from_str::<Vec<String>>(rest).map_err(|e| {
            ParseError::InvalidExecForm {
                line,
                keyword: keyword.to_string(),
                message: e.to_string(),
            }
        });
    }
    Ok(vec!["/bin/sh".to_string(), "-c".to_string(), rest.to_string()])
}

/// Split on whitespace, honouring quotes. A `\$` pair is kept intact so
/// escaped argument tokens survive.
fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match (c, quote) {
            ('\\', _) => {
                if let Some(next) = chars.next() {
                    if next == '$' {
                        current.push('\\');
                    }
                    current.push(next);
                }
                in_word = true;
            }
            ('"' | '\'', None) => {
                quote = Some(c);
                in_word = true;
            }
            (c, Some(q)) if c == q => quote = None,
            (c, None) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (c, _) => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::emit_template;
    use crate::plan::PlanError;

    const JAVA: &str = r#"ARG JAVA_VERSION=21
ARG MAVEN_VERSION=3.9.9
ARG TARGET_NAME=app.jar
ARG APP_PORT=8080

FROM maven:${MAVEN_VERSION}-eclipse-temurin-${JAVA_VERSION}-alpine AS builder

WORKDIR /app

COPY pom.xml .
RUN mvn -B dependency:go-offline

COPY src ./src
RUN mvn -B package -DskipTests

FROM eclipse-temurin:${JAVA_VERSION}-jre-alpine

WORKDIR /app

COPY --from=builder /app/target/${TARGET_NAME} /app/app.jar

RUN addgroup -S app && adduser -S app -G app
USER app

EXPOSE ${APP_PORT}

ENTRYPOINT ["java","-jar","/app/app.jar"]
"#;

    #[test]
    fn test_parse_java_dockerfile() {
        let parsed = parse(JAVA).unwrap();
        assert_eq!(parsed.arguments.len(), 4);
        assert_eq!(parsed.arguments.get("MAVEN_VERSION").unwrap().default, "3.9.9");
        assert_eq!(parsed.graph.len(), 2);

        let runtime = parsed.graph.final_stage().unwrap();
        assert_eq!(runtime.name, None);
        assert_eq!(runtime.transfers().count(), 1);
        assert!(runtime
            .instructions
            .contains(&Instruction::CreateUser(RuntimeUser::new("app").with_group("app"))));
        assert!(runtime.instructions.contains(&Instruction::entrypoint([
            "java",
            "-jar",
            "/app/app.jar"
        ])));
    }

    #[test]
    fn test_parse_then_emit_reproduces_java_dockerfile() {
        let parsed = parse(JAVA).unwrap();
        assert_eq!(emit_template(&parsed.graph, &parsed.arguments), JAVA);
    }

    #[test]
    fn test_line_continuations_and_comments() {
        let content = "# syntax=docker/dockerfile:1\nfrom alpine:3.19\nrun apk add \\\n    # cache\n    curl \\\n    git\n";
        let parsed = parse(content).unwrap();
        let stage = parsed.graph.final_stage().unwrap();
        assert_eq!(stage.instructions, vec![Instruction::run("apk add curl git")]);
    }

    #[test]
    fn test_stage_argument_import_is_noop() {
        let content = "ARG VERSION=1\nFROM alpine\nARG VERSION\nRUN echo ${VERSION}\n";
        let parsed = parse(content).unwrap();
        assert_eq!(parsed.arguments.len(), 1);
    }

    #[test]
    fn test_stage_argument_redeclared_with_default_fails() {
        let content = "ARG VERSION=1\nFROM alpine\nARG VERSION=2\n";
        assert_eq!(
            parse(content).unwrap_err(),
            ParseError::Plan {
                line: 3,
                source: PlanError::DuplicateArgument("VERSION".to_string()),
            }
        );
    }

    #[test]
    fn test_instruction_before_from() {
        let err = parse("RUN echo hi\nFROM alpine\n").unwrap_err();
        assert_eq!(err.line(), Some(1));
        assert!(matches!(err, ParseError::InstructionBeforeFrom { .. }));
    }

    #[test]
    fn test_from_later_stage_fails() {
        let content = "FROM runtime AS build\nFROM alpine AS runtime\n";
        let err = parse(content).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Plan {
                line: 1,
                source: PlanError::UnknownBaseStage { .. }
            }
        ));
    }

    #[test]
    fn test_from_earlier_stage_is_stage_base() {
        let content = "FROM alpine AS base\nRUN true\nFROM base\nCMD [\"sh\"]\n";
        let parsed = parse(content).unwrap();
        assert_eq!(parsed.graph.final_stage().unwrap().base, Base::stage("base"));
    }

    #[test]
    fn test_copy_from_keeps_sources_together() {
        let content = "FROM alpine\nFROM alpine\nCOPY --from=0 /app/*.jar /app/conf/ /out/\n";
        let parsed = parse(content).unwrap();
        let transfers: Vec<_> = parsed.graph.final_stage().unwrap().transfers().cloned().collect();
        assert_eq!(
            transfers,
            vec![ArtifactTransfer::with_sources(
                StageRef::Index(0),
                vec!["/app/*.jar".to_string(), "/app/conf/".to_string()],
                "/out/",
            )]
        );
        assert_eq!(
            emit_template(&parsed.graph, &parsed.arguments),
            "FROM alpine\n\nFROM alpine\n\nCOPY --from=0 /app/*.jar /app/conf/ /out/\n"
        );
    }

    #[test]
    fn test_copy_from_several_sources_needs_directory() {
        let content = "FROM alpine\nFROM alpine\nCOPY --from=0 /a /b /out\n";
        assert!(matches!(
            parse(content),
            Err(ParseError::InvalidSyntax { line: 3, .. })
        ));
    }

    #[test]
    fn test_env_forms() {
        let content = "FROM alpine\nENV A=1 B=\"two words\"\nENV LEGACY some value\nENV ESC=\\${KEEP}\n";
        let parsed = parse(content).unwrap();
        let stage = parsed.graph.final_stage().unwrap();
        assert_eq!(
            stage.instructions,
            vec![
                Instruction::env("A", "1"),
                Instruction::env("B", "two words"),
                Instruction::env("LEGACY", "some value"),
                Instruction::env("ESC", "\\${KEEP}"),
            ]
        );
    }

    #[test]
    fn test_expose_multiple_ports_and_shell_cmd() {
        let content = "FROM alpine\nEXPOSE 80 443/tcp\nCMD echo hello\n";
        let parsed = parse(content).unwrap();
        let stage = parsed.graph.final_stage().unwrap();
        assert_eq!(
            stage.instructions,
            vec![
                Instruction::expose("80"),
                Instruction::expose("443/tcp"),
                Instruction::cmd(["/bin/sh", "-c", "echo hello"]),
            ]
        );
    }

    #[test]
    fn test_invalid_exec_form() {
        let err = parse("FROM alpine\nENTRYPOINT [\"java\",\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidExecForm { line: 2, .. }));
    }

    #[test]
    fn test_missing_operand() {
        let err = parse("FROM alpine\nWORKDIR\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingOperand {
                line: 2,
                keyword: "WORKDIR".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_keyword_is_raw() {
        let parsed = parse("FROM alpine\nHEALTHCHECK CMD curl -f http://localhost/\n").unwrap();
        assert_eq!(
            parsed.graph.final_stage().unwrap().instructions,
            vec![Instruction::Raw(
                "HEALTHCHECK CMD curl -f http://localhost/".to_string()
            )]
        );
    }
}
