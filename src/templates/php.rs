use super::{runtime_tail, BuildTemplate, BuildType, TemplateStage};
use crate::plan::Instruction;

pub struct PhpTemplate;

impl BuildTemplate for PhpTemplate {
    fn build_type(&self) -> BuildType {
        BuildType::Php
    }

    fn description(&self) -> &'static str {
        "Composer project served by the PHP built-in server"
    }

    fn arguments(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("PHP_VERSION", "8.3"),
            ("COMPOSER_VERSION", "2"),
            ("DOCUMENT_ROOT", "public"),
            ("APP_PORT", "8080"),
        ]
    }

    fn stages(&self) -> Vec<TemplateStage> {
        let mut runtime = vec![
            Instruction::workdir("/app"),
            Instruction::transfer("builder", "/app", "/app"),
        ];
        runtime.extend(runtime_tail(
            "app",
            Instruction::cmd([
                "php",
                "-S",
                "0.0.0.0:${APP_PORT}",
                "-t",
                "${DOCUMENT_ROOT}",
            ]),
        ));

        vec![
            TemplateStage::named(
                "builder",
                "composer:${COMPOSER_VERSION}",
                vec![
                    Instruction::workdir("/app"),
                    Instruction::Copy {
                        sources: vec!["composer.json".to_string(), "composer.lock".to_string()],
                        destination: "./".to_string(),
                    },
                    Instruction::run(
                        "composer install --no-dev --no-scripts --prefer-dist --no-interaction",
                    ),
                    Instruction::copy(".", "."),
                    Instruction::run("composer dump-autoload --optimize --no-dev"),
                ],
            ),
            TemplateStage::unnamed("php:${PHP_VERSION}-cli-alpine", runtime),
        ]
    }
}
