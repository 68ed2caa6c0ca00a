//! Node.js templates: long-running services and static pages

use super::{runtime_tail, BuildTemplate, BuildType, TemplateStage};
use crate::plan::Instruction;

fn builder(script: &str) -> TemplateStage {
    TemplateStage::named(
        "builder",
        "node:${NODE_VERSION}-alpine",
        vec![
            Instruction::workdir("/app"),
            Instruction::copy("package*.json", "./"),
            Instruction::run("npm ci"),
            Instruction::copy(".", "."),
            Instruction::run(script),
        ],
    )
}

pub struct NodeServiceTemplate;

impl BuildTemplate for NodeServiceTemplate {
    fn build_type(&self) -> BuildType {
        BuildType::NodeService
    }

    fn description(&self) -> &'static str {
        "Node.js service started with npm"
    }

    fn arguments(&self) -> &'static [(&'static str, &'static str)] {
        &[("NODE_VERSION", "20"), ("APP_PORT", "3000")]
    }

    fn stages(&self) -> Vec<TemplateStage> {
        let mut runtime = vec![
            Instruction::workdir("/app"),
            Instruction::env("NODE_ENV", "production"),
            Instruction::env("PORT", "${APP_PORT}"),
            Instruction::transfer("builder", "/app", "/app"),
        ];
        runtime.extend(runtime_tail("app", Instruction::cmd(["npm", "start"])));

        vec![
            builder("npm run build --if-present && npm prune --omit=dev"),
            TemplateStage::unnamed("node:${NODE_VERSION}-alpine", runtime),
        ]
    }
}

/// Static bundle served by an unprivileged nginx
pub struct NodePageTemplate;

impl BuildTemplate for NodePageTemplate {
    fn build_type(&self) -> BuildType {
        BuildType::NodePage
    }

    fn description(&self) -> &'static str {
        "Static site built with npm and served by unprivileged nginx"
    }

    fn arguments(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("NODE_VERSION", "20"),
            ("NGINX_VERSION", "1.27"),
            ("DIST_DIR", "dist"),
            ("APP_PORT", "8080"),
        ]
    }

    fn stages(&self) -> Vec<TemplateStage> {
        vec![
            builder("npm run build"),
            TemplateStage::unnamed(
                "nginxinc/nginx-unprivileged:${NGINX_VERSION}-alpine",
                vec![
                    Instruction::transfer(
                        "builder",
                        "/app/${DIST_DIR}",
                        "/usr/share/nginx/html",
                    ),
                    // The image ships its own unprivileged user
                    Instruction::user("nginx"),
                    Instruction::expose("${APP_PORT}"),
                    Instruction::cmd(["nginx", "-g", "daemon off;"]),
                ],
            ),
        ]
    }
}
