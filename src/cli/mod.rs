pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{
    CliArgs, Commands, ListArgs, OutputFormatArg, PlanSourceArgs, RenderArgs, TemplateArgs,
    ValidateArgs,
};
pub use output::{OutputFormat, OutputFormatter};
