//! Command handlers
//!
//! Each handler returns a process exit code: 0 on success, 1 on any failure.
//! Failures are logged with their full context chain.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

use super::commands::{ListArgs, PlanSourceArgs, RenderArgs, TemplateArgs, ValidateArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::config::StageplanConfig;
use crate::fs::{FileSystem, RealFileSystem};
use crate::manifest::{derive_overrides, detect_build_type};
use crate::output::emit_template;
use crate::parsers::{parse_description, parse_dockerfile, DescriptionFormat, PlanDefinition};
use crate::plan::{BuildOverrides, BuildPlan};
use crate::templates::{BuildType, TemplateRegistry};
use crate::validation::{ValidationReport, Validator};

fn exit_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    }
}

pub fn handle_render(args: &RenderArgs, config: &StageplanConfig) -> i32 {
    exit_code(run_render(args, config))
}

pub fn handle_validate(args: &ValidateArgs, config: &StageplanConfig) -> i32 {
    exit_code(run_validate(args, config))
}

pub fn handle_template(args: &TemplateArgs) -> i32 {
    exit_code(run_template(args))
}

pub fn handle_templates(args: &ListArgs) -> i32 {
    exit_code(
        OutputFormatter::new(args.format.into())
            .format_templates(&TemplateRegistry::with_defaults())
            .map(|output| print!("{}", output)),
    )
}

pub fn handle_config(args: &ListArgs, config: &StageplanConfig) -> i32 {
    exit_code(run_config(args, config))
}

fn run_render(args: &RenderArgs, config: &StageplanConfig) -> Result<()> {
    let plan = render_plan(&args.source, config, &RealFileSystem)?;

    if args.no_validate {
        debug!("Skipping policy check");
    } else {
        let strict = args.strict || config.strict;
        Validator::default()
            .validate(&plan)
            .check(strict)
            .context("Rendered plan violates the runtime policy")?;
    }

    let format = match args.format {
        Some(format) => format.into(),
        None => OutputFormat::from_name(&config.format)
            .with_context(|| format!("Unknown output format '{}'", config.format))?,
    };
    let output = OutputFormatter::new(format).format_plan(&plan)?;
    write_output(&output, args.output.as_deref())?;

    info!(
        stages = plan.stages().len(),
        digest = %plan.digest()?,
        "Rendered build plan"
    );
    Ok(())
}

fn run_validate(args: &ValidateArgs, config: &StageplanConfig) -> Result<()> {
    let plan = render_plan(&args.source, config, &RealFileSystem)?;
    let report: ValidationReport = Validator::default().validate(&plan);

    let output = OutputFormatter::new(args.format.into()).format_report(&report)?;
    print!("{}", output);

    let strict = args.strict || config.strict;
    report
        .check(strict)
        .context("Build plan violates the runtime policy")?;
    Ok(())
}

fn run_template(args: &TemplateArgs) -> Result<()> {
    let registry = TemplateRegistry::with_defaults();
    let definition = registry.resolve(&args.build_type)?.definition()?;
    print!("{}", emit_template(&definition.graph, &definition.arguments));
    Ok(())
}

fn run_config(args: &ListArgs, config: &StageplanConfig) -> Result<()> {
    config.validate()?;
    let output = OutputFormatter::new(args.format.into()).format_config(config)?;
    print!("{}", output);
    Ok(())
}

/// Load the plan named by `source`, collect its argument values and render it.
///
/// Explicit `--arg` values win over manifest-derived ones. Manifest values
/// for arguments the plan does not declare are dropped.
pub fn render_plan(
    source: &PlanSourceArgs,
    config: &StageplanConfig,
    fs: &dyn FileSystem,
) -> Result<BuildPlan> {
    let (definition, build_type) = load_definition(source, config, fs)?;

    if definition.graph.len() > config.max_stages {
        bail!(
            "Plan has {} stages, more than the configured maximum of {}",
            definition.graph.len(),
            config.max_stages
        );
    }

    let mut overrides = BuildOverrides::parse(&source.args)?;
    if let (Some(context), Some(build_type)) = (source.context.as_deref(), build_type) {
        let derived: BuildOverrides = derive_overrides(fs, context, build_type)?
            .iter()
            .filter(|(name, _)| definition.arguments.contains(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        debug!(derived = derived.len(), "Applying manifest-derived arguments");
        overrides.merge_missing(&derived);
    }

    Ok(definition.render(overrides)?)
}

/// The plan definition plus the build type used to read manifests, if any
fn load_definition(
    source: &PlanSourceArgs,
    config: &StageplanConfig,
    fs: &dyn FileSystem,
) -> Result<(PlanDefinition, Option<BuildType>)> {
    let detected = source
        .context
        .as_deref()
        .and_then(|context| detect_build_type(fs, context));

    if let Some(path) = &source.file {
        let content = read_source(fs, path)?;
        let definition = parse_dockerfile(&content)
            .with_context(|| format!("Failed to parse Dockerfile {}", path.display()))?;
        return Ok((definition, detected));
    }

    if let Some(path) = &source.description {
        let content = read_source(fs, path)?;
        let definition = parse_description(&content, DescriptionFormat::from_path(path))
            .with_context(|| format!("Failed to parse plan description {}", path.display()))?;
        return Ok((definition, detected));
    }

    let build_type = match (&source.template, detected) {
        (Some(name), _) => name.parse::<BuildType>()?,
        (None, Some(build_type)) => {
            info!(build_type = %build_type, "Detected build type from context");
            build_type
        }
        (None, None) => config.build_type()?,
    };

    let registry = TemplateRegistry::with_defaults();
    let definition = registry.resolve(build_type.name())?.definition()?;
    Ok((definition, Some(build_type)))
}

fn read_source(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    fs.read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn write_output(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!(path = %path.display(), "Wrote build plan");
        }
        None => print!("{}", content),
    }
    Ok(())
}
