use super::{runtime_tail, BuildTemplate, BuildType, TemplateStage};
use crate::plan::Instruction;

/// WSGI application served by gunicorn. Dependencies are installed into a
/// prefix in the builder and transferred as a whole.
pub struct PythonTemplate;

impl BuildTemplate for PythonTemplate {
    fn build_type(&self) -> BuildType {
        BuildType::Python
    }

    fn description(&self) -> &'static str {
        "Python WSGI application served by gunicorn"
    }

    fn arguments(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("PYTHON_VERSION", "3.12"),
            ("APP_MODULE", "app:app"),
            ("APP_PORT", "8000"),
        ]
    }

    fn stages(&self) -> Vec<TemplateStage> {
        let mut runtime = vec![
            Instruction::workdir("/app"),
            Instruction::transfer("builder", "/install", "/usr/local"),
            Instruction::copy(".", "."),
        ];
        runtime.extend(runtime_tail(
            "app",
            Instruction::cmd([
                "gunicorn",
                "--bind",
                "0.0.0.0:${APP_PORT}",
                "${APP_MODULE}",
            ]),
        ));

        vec![
            TemplateStage::named(
                "builder",
                "python:${PYTHON_VERSION}-alpine",
                vec![
                    Instruction::workdir("/app"),
                    Instruction::copy("requirements.txt", "."),
                    Instruction::run(
                        "pip install --no-cache-dir --prefix=/install -r requirements.txt",
                    ),
                ],
            ),
            TemplateStage::unnamed("python:${PYTHON_VERSION}-alpine", runtime),
        ]
    }
}
