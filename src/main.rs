use stageplan::cli::commands::{CliArgs, Commands};
use stageplan::cli::handlers::{
    handle_config, handle_render, handle_template, handle_templates, handle_validate,
};
use stageplan::util::logging::{self, parse_level, LoggingConfig};
use stageplan::{StageplanConfig, VERSION};

use clap::Parser;
use tracing::{debug, Level};

fn main() {
    let args = CliArgs::parse();
    let config = StageplanConfig::default();
    init_logging_from_args(&args, &config);

    debug!("stageplan v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Render(render_args) => handle_render(render_args, &config),
        Commands::Validate(validate_args) => handle_validate(validate_args, &config),
        Commands::Template(template_args) => handle_template(template_args),
        Commands::Templates(list_args) => handle_templates(list_args),
        Commands::Config(list_args) => handle_config(list_args, &config),
    };

    std::process::exit(exit_code);
}

/// `--log-level` wins over `-v`/`-q`, which win over the environment.
fn init_logging_from_args(args: &CliArgs, config: &StageplanConfig) {
    let level = if let Some(level) = &args.log_level {
        parse_level(level).unwrap_or_else(|| {
            eprintln!(
                "Invalid log level '{}', using info. Valid levels: trace, debug, info, warn, error",
                level
            );
            Level::INFO
        })
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        parse_level(&config.log_level).unwrap_or(Level::INFO)
    };

    let logging_config = LoggingConfig {
        level,
        include_target: !args.quiet,
        ..logging::config_from_env()
    };
    logging::init_logging(&logging_config);
}
