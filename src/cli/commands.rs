use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parameterized multi-stage container build plan renderer
#[derive(Parser, Debug)]
#[command(
    name = "stageplan",
    about = "Parameterized multi-stage container build plan renderer",
    version,
    author,
    long_about = "stageplan renders parameterized multi-stage build plans into concrete \
                  Dockerfiles. Plans come from built-in templates, existing Dockerfiles or \
                  YAML/JSON descriptions; argument values come from --arg overrides, project \
                  manifests and declared defaults. Rendered plans are checked against a \
                  runtime policy before they are written."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Render a build plan",
        long_about = "Resolves every argument of a plan, checks cross-stage transfers and the \
                      runtime policy, and writes the rendered plan.\n\n\
                      Examples:\n  \
                      stageplan render java\n  \
                      stageplan render --context ./service\n  \
                      stageplan render go --arg GO_VERSION=1.23 --format json\n  \
                      stageplan render --file Dockerfile --arg APP_PORT=9090"
    )]
    Render(RenderArgs),

    #[command(
        about = "Check a build plan against the runtime policy",
        long_about = "Renders a plan and reports policy findings for its final stage.\n\n\
                      Examples:\n  \
                      stageplan validate --file Dockerfile\n  \
                      stageplan validate node-page --strict"
    )]
    Validate(ValidateArgs),

    #[command(about = "Print the parameterized Dockerfile of a built-in template")]
    Template(TemplateArgs),

    #[command(about = "List built-in templates")]
    Templates(ListArgs),

    #[command(about = "Show the effective configuration")]
    Config(ListArgs),
}

/// Where a plan comes from and which argument values apply to it
#[derive(Args, Debug, Clone, Default)]
pub struct PlanSourceArgs {
    #[arg(
        value_name = "TEMPLATE",
        help = "Built-in template (detected from --context, else STAGEPLAN_TEMPLATE)"
    )]
    pub template: Option<String>,

    #[arg(
        short = 'f',
        long,
        value_name = "PATH",
        conflicts_with_all = ["template", "description"],
        help = "Parameterized Dockerfile to render"
    )]
    pub file: Option<PathBuf>,

    #[arg(
        short = 'd',
        long,
        value_name = "PATH",
        conflicts_with = "template",
        help = "YAML or JSON plan description to render"
    )]
    pub description: Option<PathBuf>,

    #[arg(
        short = 'c',
        long,
        value_name = "DIR",
        help = "Project directory whose manifests supply argument values"
    )]
    pub context: Option<PathBuf>,

    #[arg(
        short = 'a',
        long = "arg",
        value_name = "KEY=VALUE",
        help = "Override a build argument (repeatable)"
    )]
    pub args: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub source: PlanSourceArgs,

    #[arg(
        long,
        value_enum,
        help = "Output format (defaults to STAGEPLAN_FORMAT, else dockerfile)"
    )]
    pub format: Option<OutputFormatArg>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Skip the runtime policy check")]
    pub no_validate: bool,

    #[arg(long, conflicts_with = "no_validate", help = "Treat policy warnings as errors")]
    pub strict: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub source: PlanSourceArgs,

    #[arg(long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,

    #[arg(long, help = "Treat policy warnings as errors")]
    pub strict: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TemplateArgs {
    #[arg(value_name = "TYPE", help = "Build type, e.g. java, go, node-service")]
    pub build_type: String,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Dockerfile,
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Dockerfile => super::output::OutputFormat::Dockerfile,
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
