//! JVM templates (Maven and Gradle)

use super::{runtime_tail, BuildTemplate, BuildType, TemplateStage};
use crate::plan::Instruction;

const RUNTIME_IMAGE: &str = "eclipse-temurin:${JAVA_VERSION}-jre-alpine";

fn runtime_stage(artifact_dir: &str) -> TemplateStage {
    let mut instructions = vec![
        Instruction::workdir("/app"),
        Instruction::transfer(
            "builder",
            format!("{}/${{TARGET_NAME}}", artifact_dir),
            "/app/app.jar",
        ),
    ];
    instructions.extend(runtime_tail(
        "app",
        Instruction::entrypoint(["java", "-jar", "/app/app.jar"]),
    ));
    TemplateStage::unnamed(RUNTIME_IMAGE, instructions)
}

pub struct MavenTemplate;

impl BuildTemplate for MavenTemplate {
    fn build_type(&self) -> BuildType {
        BuildType::Java
    }

    fn description(&self) -> &'static str {
        "Maven project packaged as an executable jar on a Temurin JRE"
    }

    fn arguments(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("JAVA_VERSION", "21"),
            ("MAVEN_VERSION", "3.9.9"),
            ("TARGET_NAME", "app.jar"),
            ("APP_PORT", "8080"),
        ]
    }

    fn stages(&self) -> Vec<TemplateStage> {
        vec![
            TemplateStage::named(
                "builder",
                "maven:${MAVEN_VERSION}-eclipse-temurin-${JAVA_VERSION}-alpine",
                vec![
                    Instruction::workdir("/app"),
                    Instruction::copy("pom.xml", "."),
                    Instruction::run("mvn -B dependency:go-offline"),
                    Instruction::copy("src", "./src"),
                    Instruction::run("mvn -B package -DskipTests"),
                ],
            ),
            runtime_stage("/app/target"),
        ]
    }
}

pub struct GradleTemplate;

impl BuildTemplate for GradleTemplate {
    fn build_type(&self) -> BuildType {
        BuildType::JavaGradle
    }

    fn description(&self) -> &'static str {
        "Gradle project packaged as an executable jar on a Temurin JRE"
    }

    fn arguments(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("JAVA_VERSION", "21"),
            ("GRADLE_VERSION", "8.10"),
            ("TARGET_NAME", "app.jar"),
            ("APP_PORT", "8080"),
        ]
    }

    fn stages(&self) -> Vec<TemplateStage> {
        vec![
            TemplateStage::named(
                "builder",
                "gradle:${GRADLE_VERSION}-jdk${JAVA_VERSION}-alpine",
                vec![
                    Instruction::workdir("/app"),
                    Instruction::Copy {
                        sources: vec!["build.gradle*".to_string(), "settings.gradle*".to_string()],
                        destination: "./".to_string(),
                    },
                    Instruction::run("gradle --no-daemon dependencies"),
                    Instruction::copy("src", "./src"),
                    Instruction::run("gradle --no-daemon build -x test"),
                ],
            ),
            runtime_stage("/app/build/libs"),
        ]
    }
}
