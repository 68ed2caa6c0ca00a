//! Output formatting for multiple formats
//!
//! Build plans can be written as a Dockerfile, JSON, YAML or a human
//! readable summary. Reports, configuration and template listings have no
//! Dockerfile form and fall back to human output.
//!
//! # Example
//!
//! ```no_run
//! use stageplan::cli::output::{OutputFormat, OutputFormatter};
//! use stageplan::templates::TemplateRegistry;
//! use stageplan::BuildOverrides;
//!
//! # fn main() -> anyhow::Result<()> {
//! let plan = TemplateRegistry::with_defaults()
//!     .resolve("java")?
//!     .definition()?
//!     .render(BuildOverrides::new())?;
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! println!("{}", formatter.format_plan(&plan)?);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::StageplanConfig;
use crate::output::emit_plan;
use crate::plan::BuildPlan;
use crate::templates::TemplateRegistry;
use crate::validation::ValidationReport;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Dockerfile text for the external image builder
    Dockerfile,
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly, version-control friendly)
    Yaml,
    /// Human-readable formatted text
    Human,
}

impl OutputFormat {
    /// Parse a configured format name (`dockerfile`, `json`, `yaml`, `human`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "dockerfile" => Some(OutputFormat::Dockerfile),
            "json" => Some(OutputFormat::Json),
            "yaml" => Some(OutputFormat::Yaml),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }
}

/// Machine-readable plan output: the plan plus its digest and runtime config
#[derive(Serialize)]
struct PlanDocument<'a> {
    digest: String,
    plan: &'a BuildPlan,
    runtime: crate::plan::ImageConfig,
}

#[derive(Serialize)]
struct TemplateSummary<'a> {
    name: &'a str,
    description: &'a str,
    arguments: BTreeMap<&'a str, &'a str>,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Formats a rendered build plan according to the configured format
    pub fn format_plan(&self, plan: &BuildPlan) -> Result<String> {
        match self.format {
            OutputFormat::Dockerfile => Ok(emit_plan(plan)),
            OutputFormat::Json => {
                let document = plan_document(plan)?;
                serde_json::to_string_pretty(&document)
                    .context("Failed to serialize build plan to JSON")
            }
            OutputFormat::Yaml => {
                let document = plan_document(plan)?;
                serde_yaml::to_string(&document).context("Failed to serialize build plan to YAML")
            }
            OutputFormat::Human => {
                let digest = plan.digest()?;
                Ok(format!("{}\nDigest: {}\n", plan, digest))
            }
        }
    }

    /// Formats the policy findings for a plan
    pub fn format_report(&self, report: &ValidationReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report)
                .context("Failed to serialize validation report to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(report)
                .context("Failed to serialize validation report to YAML"),
            OutputFormat::Dockerfile | OutputFormat::Human => Ok(format_report_human(report)),
        }
    }

    /// Formats configuration display
    pub fn format_config(&self, config: &StageplanConfig) -> Result<String> {
        let config_map: BTreeMap<String, String> = config.to_display_map().into_iter().collect();
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&config_map)
                .context("Failed to serialize config to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&config_map).context("Failed to serialize config to YAML")
            }
            OutputFormat::Dockerfile | OutputFormat::Human => Ok(config.to_string()),
        }
    }

    /// Formats the list of built-in templates
    pub fn format_templates(&self, registry: &TemplateRegistry) -> Result<String> {
        let summaries: Vec<TemplateSummary> = registry
            .iter()
            .map(|template| TemplateSummary {
                name: template.build_type().name(),
                description: template.description(),
                arguments: template.arguments().iter().copied().collect(),
            })
            .collect();

        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&summaries)
                .context("Failed to serialize templates to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&summaries).context("Failed to serialize templates to YAML")
            }
            OutputFormat::Dockerfile | OutputFormat::Human => {
                let mut output = String::new();
                output.push_str("Built-in Templates\n");
                output.push_str(RULE);
                output.push_str("\n\n");
                for summary in &summaries {
                    output.push_str(&format!("{:<14} {}\n", summary.name, summary.description));
                }
                Ok(output)
            }
        }
    }
}

fn plan_document(plan: &BuildPlan) -> Result<PlanDocument<'_>> {
    Ok(PlanDocument {
        digest: plan.digest()?,
        plan,
        runtime: plan.final_config(),
    })
}

fn format_report_human(report: &ValidationReport) -> String {
    let mut output = String::new();

    if report.has_errors() {
        output.push_str("\u{2717} Policy Check Failed\n");
    } else if report.has_warnings() {
        output.push_str("\u{26A0} Policy Check Passed With Warnings\n");
    } else {
        output.push_str("\u{2713} Policy Check Passed\n");
    }
    output.push_str(RULE);
    output.push_str("\n\n");

    if report.is_clean() {
        output.push_str("No findings\n");
        return output;
    }

    for (i, finding) in report.findings.iter().enumerate() {
        let connector = if i == report.findings.len() - 1 {
            "\u{2514}"
        } else {
            "\u{251C}"
        };
        output.push_str(&format!("{}\u{2500} {}\n", connector, finding));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{ArgumentRegistry, Base, BuildOverrides, Instruction, StageGraph};
    use crate::validation::{Finding, FindingKind, Validator};

    fn sample_plan() -> BuildPlan {
        let registry = ArgumentRegistry::from_pairs([("APP_PORT", "8080")]).unwrap();
        let mut graph = StageGraph::new();
        graph
            .add_stage(
                None,
                Base::image("alpine:3.20"),
                vec![
                    Instruction::user("app"),
                    Instruction::expose("${APP_PORT}"),
                    Instruction::cmd(["/app/server"]),
                ],
            )
            .unwrap();
        crate::plan::render(&graph, &registry, BuildOverrides::new()).unwrap()
    }

    #[test]
    fn test_format_names() {
        assert_eq!(OutputFormat::from_name("JSON"), Some(OutputFormat::Json));
        assert_eq!(
            OutputFormat::from_name("dockerfile"),
            Some(OutputFormat::Dockerfile)
        );
        assert_eq!(OutputFormat::from_name("toml"), None);
    }

    #[test]
    fn test_dockerfile_format() {
        let output = OutputFormatter::new(OutputFormat::Dockerfile)
            .format_plan(&sample_plan())
            .unwrap();
        assert!(output.starts_with("FROM alpine:3.20\n"));
        assert!(output.contains("EXPOSE 8080"));
        assert!(!output.contains("ARG"));
    }

    #[test]
    fn test_json_format() {
        let plan = sample_plan();
        let output = OutputFormatter::new(OutputFormat::Json)
            .format_plan(&plan)
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["digest"], serde_json::json!(plan.digest().unwrap()));
        assert_eq!(parsed["runtime"]["exposed_ports"][0], "8080");
    }

    #[test]
    fn test_yaml_format() {
        let output = OutputFormatter::new(OutputFormat::Yaml)
            .format_plan(&sample_plan())
            .unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&output).unwrap();
        assert!(parsed.get("plan").is_some());
    }

    #[test]
    fn test_human_format() {
        let output = OutputFormatter::new(OutputFormat::Human)
            .format_plan(&sample_plan())
            .unwrap();
        assert!(output.contains("Build Plan"));
        assert!(output.contains("Digest: sha256:"));
    }

    #[test]
    fn test_report_human() {
        let report = Validator::default().validate(&sample_plan());
        let output = OutputFormatter::new(OutputFormat::Human)
            .format_report(&report)
            .unwrap();
        assert!(output.contains("Policy Check Passed"));
        assert!(output.contains("No findings"));

        let report = ValidationReport {
            findings: vec![Finding::error(
                "EntryCommand",
                FindingKind::MissingEntryCommand,
                "no ENTRYPOINT or CMD",
            )],
        };
        let output = OutputFormatter::new(OutputFormat::Human)
            .format_report(&report)
            .unwrap();
        assert!(output.contains("Policy Check Failed"));
        assert!(output.contains("no ENTRYPOINT or CMD"));
    }

    #[test]
    fn test_templates_listing() {
        let registry = TemplateRegistry::with_defaults();
        let output = OutputFormatter::new(OutputFormat::Human)
            .format_templates(&registry)
            .unwrap();
        assert!(output.contains("java-gradle"));
        assert!(output.contains("node-page"));

        let json = OutputFormatter::new(OutputFormat::Json)
            .format_templates(&registry)
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(7));
    }
}
