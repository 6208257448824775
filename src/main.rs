use clap::Parser;
use colored::Colorize;

use mecal::cli::args::{Cli, Commands, OutputFormat};
use mecal::cli::commands::{self, Context};
use mecal::config::{ColorSetting, Config, Paths};
use mecal::error::MecalError;
use mecal::output::format_error_json;

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("MECAL_LOG", level)).init();

    let mut format = cli.output.unwrap_or_default();
    let result = match cli.command {
        // Completions work without a readable config.
        Commands::Completions {
            shell,
            instructions,
        } => commands::completions(shell, instructions),
        command => setup(cli.output).and_then(|ctx| {
            format = ctx.format;
            dispatch(&ctx, command)
        }),
    };

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
        },
        Err(e) => {
            match format {
                OutputFormat::Json => eprintln!("{}", format_error_json(&e)),
                OutputFormat::Pretty => eprintln!("{}: {}", "error".red().bold(), e),
            }
            std::process::exit(1);
        },
    }
}

fn setup(output: Option<OutputFormat>) -> Result<Context, MecalError> {
    let paths = Paths::new()?;
    let config = Config::load_from_path(&paths.config_file)?
        .with_env_overrides(|key| std::env::var(key).ok());

    match config.general.color {
        ColorSetting::Always => colored::control::set_override(true),
        ColorSetting::Never => colored::control::set_override(false),
        ColorSetting::Auto => {},
    }

    let format = output.unwrap_or(config.general.default_output);
    Ok(Context::new(config, paths, format))
}

fn dispatch(ctx: &Context, command: Commands) -> Result<String, MecalError> {
    match command {
        Commands::Project(args) => commands::project(ctx, args.command),
        Commands::Memory(args) => commands::memory(ctx, args.command),
        Commands::Assignment(args) => commands::assignment(ctx, args.command),
        Commands::Clients => commands::clients(ctx),
        Commands::Profiles => commands::profiles(ctx),
        Commands::Sync(args) => commands::sync(ctx, args.command),
        Commands::Cache(args) => commands::cache(ctx, args.command),
        Commands::Config(args) => commands::config(ctx, args.command),
        Commands::Completions {
            shell,
            instructions,
        } => commands::completions(shell, instructions),
    }
}
