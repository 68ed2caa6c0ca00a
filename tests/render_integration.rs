//! Rendering scenarios through the public library API
//!
//! Covers argument resolution, stage ordering, artifact provenance, the
//! token grammar, and plan immutability and idempotence.

use stageplan::output::{emit_plan, emit_template};
use stageplan::parsers::parse_dockerfile;
use stageplan::validation::{FindingKind, Validator};
use stageplan::{
    render, ArgumentRegistry, Base, BuildOverrides, BuildPlan, Instruction, PlanError,
    StageGraph, StageRef, TemplateRegistry,
};
use yare::parameterized;

fn java_graph() -> (StageGraph, ArgumentRegistry) {
    let definition = TemplateRegistry::with_defaults()
        .resolve("java")
        .unwrap()
        .definition()
        .unwrap();
    (definition.graph, definition.arguments)
}

fn registry(pairs: &[(&str, &str)]) -> ArgumentRegistry {
    ArgumentRegistry::from_pairs(pairs.iter().copied()).unwrap()
}

fn runtime_tail() -> Vec<Instruction> {
    vec![Instruction::user("app"), Instruction::cmd(["/app/run"])]
}

#[test]
fn test_java_template_matches_fixture() {
    let (graph, registry) = java_graph();
    let expected = std::fs::read_to_string("tests/fixtures/Dockerfile.java").unwrap();
    assert_eq!(emit_template(&graph, &registry), expected);
}

#[test]
fn test_java_defaults() {
    let (graph, registry) = java_graph();
    let plan = render(&graph, &registry, BuildOverrides::new()).unwrap();

    assert_eq!(
        plan.stages()[0].base,
        Base::image("maven:3.9.9-eclipse-temurin-21-alpine")
    );
    assert_eq!(
        plan.final_stage().base,
        Base::image("eclipse-temurin:21-jre-alpine")
    );

    let transfer = plan.final_stage().transfers().next().unwrap();
    assert_eq!(transfer.source, StageRef::name("builder"));
    assert_eq!(transfer.source_paths, vec!["/app/target/app.jar"]);
    assert_eq!(transfer.destination_path, "/app/app.jar");

    let config = plan.final_config();
    assert_eq!(config.user.map(|u| u.to_string()), Some("app".to_string()));
    assert_eq!(config.exposed_ports, vec!["8080".to_string()]);
    assert_eq!(
        config.entrypoint,
        Some(vec![
            "java".to_string(),
            "-jar".to_string(),
            "/app/app.jar".to_string()
        ])
    );
}

#[test]
fn test_java_overrides() {
    let (graph, registry) = java_graph();
    let overrides = BuildOverrides::new()
        .with("JAVA_VERSION", "17")
        .with("TARGET_NAME", "svc.jar")
        .with("APP_PORT", "9090");
    let plan = render(&graph, &registry, overrides).unwrap();

    assert_eq!(
        plan.final_stage().base,
        Base::image("eclipse-temurin:17-jre-alpine")
    );
    let dockerfile = emit_plan(&plan);
    assert!(dockerfile.contains("COPY --from=builder /app/target/svc.jar /app/app.jar"));
    assert!(dockerfile.contains("EXPOSE 9090"));
    assert!(!dockerfile.contains("${"));
    assert!(!dockerfile.contains("ARG "));
}

#[test]
fn test_emitted_plan_parses_back_to_same_stages() {
    let (graph, registry) = java_graph();
    let overrides = BuildOverrides::new().with("TARGET_NAME", "${JAVA_VERSION}.jar");
    let plan = render(&graph, &registry, overrides).unwrap();

    let dockerfile = emit_plan(&plan);
    assert!(dockerfile.contains("COPY --from=builder /app/target/\\${JAVA_VERSION}.jar /app/app.jar"));

    let reparsed = parse_dockerfile(&dockerfile)
        .unwrap()
        .render(BuildOverrides::new())
        .unwrap();
    assert_eq!(reparsed.stages(), plan.stages());
}

#[parameterized(
    port_exposed = { true },
    port_not_exposed = { false },
)]
fn test_final_stage_built_on_builder_with_port_override(expose: bool) {
    let registry = registry(&[("PORT", "8080")]);
    let mut graph = StageGraph::new();
    graph
        .add_stage(
            Some("builder"),
            Base::image("alpine:3.20"),
            vec![Instruction::run("make PORT=${PORT}")],
        )
        .unwrap();
    let mut instructions = vec![
        Instruction::transfer("builder", "/app/out", "/app/out"),
        Instruction::env("PORT", "${PORT}"),
        Instruction::user("app"),
        Instruction::cmd(["/app/out/server", "--port", "${PORT}"]),
    ];
    if expose {
        instructions.push(Instruction::expose("${PORT}"));
    }
    graph
        .add_stage(Some("final"), Base::stage("builder"), instructions)
        .unwrap();

    let plan = render(&graph, &registry, BuildOverrides::new().with("PORT", "9090")).unwrap();
    assert_eq!(plan.argument("PORT"), Some("9090"));
    assert_eq!(plan.stages()[0].instructions[0], Instruction::run("make PORT=9090"));

    let final_stage = plan.final_stage();
    assert_eq!(final_stage.base, Base::stage("builder"));
    let transfer = final_stage.transfers().next().unwrap();
    assert_eq!(transfer.source, StageRef::name("builder"));
    assert_eq!(transfer.source_paths, vec!["/app/out"]);
    assert_eq!(transfer.destination_path, "/app/out");
    assert!(final_stage
        .instructions
        .contains(&Instruction::env("PORT", "9090")));
    assert!(final_stage
        .instructions
        .contains(&Instruction::cmd(["/app/out/server", "--port", "9090"])));

    let serialized = serde_json::to_string(final_stage).unwrap();
    assert!(!serialized.contains("${PORT}"));
    assert!(!serialized.contains("8080"));

    let report = Validator::default().validate(&plan);
    assert_eq!(report.contains(FindingKind::NoExposedPort), !expose);
    assert!(!report.has_errors(), "{:?}", report.findings);
    if expose {
        assert_eq!(plan.final_config().exposed_ports, vec!["9090".to_string()]);
    }
}

#[test]
fn test_empty_default_overridden() {
    let registry = registry(&[("TAG", "")]);
    let mut graph = StageGraph::new();
    graph
        .add_stage(None, Base::image("alpine:${TAG}"), runtime_tail())
        .unwrap();

    let plan = render(&graph, &registry, BuildOverrides::new().with("TAG", "3.20")).unwrap();
    assert_eq!(plan.final_stage().base, Base::image("alpine:3.20"));

    // An empty value is still a value
    let plan = render(&graph, &registry, BuildOverrides::new()).unwrap();
    assert_eq!(plan.final_stage().base, Base::image("alpine:"));
}

#[test]
fn test_undeclared_override_suggests_name() {
    let (graph, registry) = java_graph();
    let err = render(
        &graph,
        &registry,
        BuildOverrides::new().with("JAVA_VERISON", "17"),
    )
    .unwrap_err();

    assert_eq!(
        err,
        PlanError::UndeclaredArgument {
            name: "JAVA_VERISON".to_string(),
            suggestion: Some("JAVA_VERSION".to_string()),
        }
    );
    assert!(err.to_string().contains("did you mean 'JAVA_VERSION'"));
}

#[parameterized(
    forward = { "later", "ForwardReference" },
    self_reference = { "runtime", "ForwardReference" },
    unknown = { "missing", "UnknownStage" },
    external_image = { "alpine", "UnknownStage" },
)]
fn test_transfer_provenance(source: &str, expected_kind: &str) {
    let mut graph = StageGraph::new();
    graph
        .add_stage(Some("builder"), Base::image("alpine"), vec![])
        .unwrap();
    let mut instructions = vec![Instruction::transfer(source, "/out", "/in")];
    instructions.extend(runtime_tail());
    graph
        .add_stage(Some("runtime"), Base::image("alpine"), instructions)
        .unwrap();
    graph
        .add_stage(Some("later"), Base::image("alpine"), vec![])
        .unwrap();

    let err = render(&graph, &ArgumentRegistry::new(), BuildOverrides::new()).unwrap_err();
    assert_eq!(err.kind(), expected_kind);
}

#[test]
fn test_transfer_by_index() {
    let mut graph = StageGraph::new();
    graph.add_stage(None, Base::image("alpine"), vec![]).unwrap();
    let mut instructions = vec![Instruction::Transfer(stageplan::ArtifactTransfer::new(
        StageRef::Index(0),
        "/out",
        "/in",
    ))];
    instructions.extend(runtime_tail());
    graph
        .add_stage(None, Base::image("alpine"), instructions)
        .unwrap();

    assert!(render(&graph, &ArgumentRegistry::new(), BuildOverrides::new()).is_ok());
}

#[test]
fn test_conflicting_transfer_destinations() {
    let registry = registry(&[("DEST", "/app/bin")]);
    let mut graph = StageGraph::new();
    graph
        .add_stage(Some("a"), Base::image("alpine"), vec![])
        .unwrap();
    graph
        .add_stage(Some("b"), Base::image("alpine"), vec![])
        .unwrap();
    graph
        .add_stage(
            None,
            Base::image("alpine"),
            vec![
                Instruction::transfer("a", "/out", "${DEST}"),
                Instruction::transfer("b", "/out", "/app/bin/"),
            ],
        )
        .unwrap();

    let err = render(&graph, &registry, BuildOverrides::new()).unwrap_err();
    assert!(matches!(err, PlanError::TransferConflict { ref destination, .. } if destination.starts_with("/app/bin")));
}

#[test]
fn test_base_stage_must_exist_first() {
    let mut graph = StageGraph::new();
    let err = graph
        .add_stage(Some("runtime"), Base::stage("builder"), vec![])
        .unwrap_err();
    assert_eq!(err.kind(), "UnknownBaseStage");
    assert!(graph.is_empty());
}

#[test]
fn test_stage_derived_from_earlier_stage_inherits_config() {
    let mut graph = StageGraph::new();
    graph
        .add_stage(
            Some("base"),
            Base::image("alpine:3.20"),
            vec![
                Instruction::user("app"),
                Instruction::expose("8080"),
                Instruction::cmd(["/bin/sh"]),
            ],
        )
        .unwrap();
    graph
        .add_stage(
            None,
            Base::stage("base"),
            vec![Instruction::entrypoint(["/app/server"])],
        )
        .unwrap();

    let plan = render(&graph, &ArgumentRegistry::new(), BuildOverrides::new()).unwrap();
    let config = plan.final_config();
    assert_eq!(config.base_image, "alpine:3.20");
    assert_eq!(config.exposed_ports, vec!["8080".to_string()]);
    assert_eq!(config.entrypoint, Some(vec!["/app/server".to_string()]));
    // A new ENTRYPOINT drops the inherited CMD
    assert_eq!(config.cmd, None);
}

#[parameterized(
    unbraced = { "echo $HOME", "echo $HOME" },
    subshell = { "echo $(date)", "echo $(date)" },
    lone_dollar = { "cost: 5$", "cost: 5$" },
    escaped = { "echo \\${NAME}", "echo ${NAME}" },
    braced = { "echo ${NAME}", "echo world" },
    adjacent = { "${NAME}${NAME}", "worldworld" },
)]
fn test_token_grammar(command: &str, expected: &str) {
    let registry = registry(&[("NAME", "world")]);
    let mut graph = StageGraph::new();
    let mut instructions = vec![Instruction::run(command)];
    instructions.extend(runtime_tail());
    graph
        .add_stage(None, Base::image("alpine"), instructions)
        .unwrap();

    let plan = render(&graph, &registry, BuildOverrides::new()).unwrap();
    assert_eq!(plan.final_stage().instructions[0], Instruction::run(expected));
}

#[parameterized(
    unterminated = { "echo ${NAME" },
    empty = { "echo ${}" },
    invalid_name = { "echo ${1NAME}" },
    undeclared = { "echo ${OTHER}" },
)]
fn test_malformed_or_unknown_tokens_fail(command: &str) {
    let registry = registry(&[("NAME", "world")]);
    let mut graph = StageGraph::new();
    graph
        .add_stage(
            Some("build"),
            Base::image("alpine"),
            vec![Instruction::run(command)],
        )
        .unwrap();

    let err = render(&graph, &registry, BuildOverrides::new()).unwrap_err();
    assert!(matches!(err, PlanError::UnresolvedArgument { ref stage, .. } if stage == "build"));
}

#[test]
fn test_substituted_values_are_not_rescanned() {
    let registry = registry(&[("A", "x"), ("B", "y")]);
    let mut graph = StageGraph::new();
    graph
        .add_stage(None, Base::image("alpine"), vec![Instruction::run("echo ${A}")])
        .unwrap();

    let plan = render(&graph, &registry, BuildOverrides::new().with("A", "${B}")).unwrap();
    assert_eq!(plan.final_stage().instructions[0], Instruction::run("echo ${B}"));
}

#[test]
fn test_empty_graph() {
    let err = render(
        &StageGraph::new(),
        &ArgumentRegistry::new(),
        BuildOverrides::new(),
    )
    .unwrap_err();
    assert_eq!(err, PlanError::EmptyGraph);
}

#[test]
fn test_render_is_idempotent() {
    let (graph, registry) = java_graph();
    let overrides = BuildOverrides::new().with("APP_PORT", "9000");

    let first = render(&graph, &registry, overrides.clone()).unwrap();
    let second = render(&graph, &registry, overrides).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.digest().unwrap(), second.digest().unwrap());
    assert!(first.digest().unwrap().starts_with("sha256:"));

    let other = render(&graph, &registry, BuildOverrides::new()).unwrap();
    assert_ne!(first.digest().unwrap(), other.digest().unwrap());
}

#[test]
fn test_parallel_renders_share_inputs() {
    let (graph, registry) = java_graph();
    let ports = ["8080", "8081", "8082", "8083"];

    let plans: Vec<BuildPlan> = std::thread::scope(|scope| {
        let handles: Vec<_> = ports
            .iter()
            .map(|port| {
                let graph = &graph;
                let registry = &registry;
                scope.spawn(move || {
                    render(graph, registry, BuildOverrides::new().with("APP_PORT", *port))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect()
    });

    for (plan, port) in plans.iter().zip(ports) {
        assert_eq!(plan.final_config().exposed_ports, vec![port.to_string()]);
    }
    // Inputs are unchanged by rendering
    assert_eq!(registry.get("APP_PORT").unwrap().default, "8080");
}

#[test]
fn test_plan_serialization() {
    let (graph, registry) = java_graph();
    let plan = render(&graph, &registry, BuildOverrides::new()).unwrap();

    let json: serde_json::Value = serde_json::from_str(&plan.to_json().unwrap()).unwrap();
    assert_eq!(json["stages"].as_array().map(Vec::len), Some(2));

    let yaml = plan.to_yaml().unwrap();
    assert!(yaml.contains("builder"));
}
