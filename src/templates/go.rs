use super::{runtime_tail, BuildTemplate, BuildType, TemplateStage};
use crate::plan::Instruction;

/// Statically linked Go binary on Alpine
pub struct GoTemplate;

impl BuildTemplate for GoTemplate {
    fn build_type(&self) -> BuildType {
        BuildType::Go
    }

    fn description(&self) -> &'static str {
        "Go module compiled to a static binary on Alpine"
    }

    fn arguments(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("GO_VERSION", "1.22"),
            ("ALPINE_VERSION", "3.20"),
            ("TARGET_NAME", "app"),
            ("APP_PORT", "8080"),
        ]
    }

    fn stages(&self) -> Vec<TemplateStage> {
        let mut runtime = vec![
            Instruction::workdir("/app"),
            Instruction::transfer("builder", "/out/${TARGET_NAME}", "/app/${TARGET_NAME}"),
        ];
        runtime.extend(runtime_tail(
            "app",
            Instruction::entrypoint(["/app/${TARGET_NAME}"]),
        ));

        vec![
            TemplateStage::named(
                "builder",
                "golang:${GO_VERSION}-alpine",
                vec![
                    Instruction::workdir("/src"),
                    Instruction::Copy {
                        sources: vec!["go.mod".to_string(), "go.sum".to_string()],
                        destination: "./".to_string(),
                    },
                    Instruction::run("go mod download"),
                    Instruction::copy(".", "."),
                    Instruction::run("CGO_ENABLED=0 go build -o /out/${TARGET_NAME} ."),
                ],
            ),
            TemplateStage::unnamed("alpine:${ALPINE_VERSION}", runtime),
        ]
    }
}
