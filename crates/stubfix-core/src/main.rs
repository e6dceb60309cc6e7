use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use stubfix_core::{check, migrate, CodemodKind, ProjectConfig, RunOptions, RunSettings, TypeshedConfig};

#[derive(Parser)]
#[command(name = "stubfix")]
#[command(about = "Migrate Python stub files to current typing syntax", long_about = None)]
#[command(version)]
struct Cli {
    /// Project root holding the stub directories
    #[arg(long, default_value = ".", value_hint = clap::ValueHint::DirPath)]
    project: PathBuf,

    /// Configuration file (defaults to <project>/pyproject.toml)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Log every patch decision
    #[arg(short, long)]
    verbose: bool,

    /// Worker threads for the per-file pipeline
    #[arg(long)]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite stubs in place, then run formatters and the validation gate
    Migrate(MigrateArgs),

    /// Report old-style syntax without rewriting anything
    Check {
        /// Stub roots, relative to the project (defaults to the configured roots)
        roots: Vec<PathBuf>,
    },
}

#[derive(Args, Default)]
struct MigrateArgs {
    /// Codemod to run; repeat for several (defaults to pep585 and type-aliases)
    #[arg(long = "codemod", value_enum)]
    codemods: Vec<CodemodKind>,

    /// Skip the configured formatters
    #[arg(long)]
    no_format: bool,

    /// Skip the validation gate
    #[arg(long)]
    no_check: bool,

    /// Stub roots, relative to the project (defaults to the configured roots)
    roots: Vec<PathBuf>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<(TypeshedConfig, RunSettings)> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => {
            let default = cli.project.join("pyproject.toml");
            if !default.exists() {
                warn!(path = %default.display(), "no pyproject.toml, using defaults");
                return Ok((TypeshedConfig::default(), RunSettings::default()));
            }
            default
        }
    };
    let config = ProjectConfig::load(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    Ok((config.typeshed, config.settings))
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (typeshed, mut settings) = load_config(&cli)?;
    if let Some(jobs) = cli.jobs {
        settings.jobs = jobs;
    }

    let session = match cli.command.unwrap_or(Commands::Migrate(MigrateArgs::default())) {
        Commands::Migrate(args) => {
            if !args.roots.is_empty() {
                settings.roots = args.roots;
            }
            let mut options = RunOptions::new(&cli.project, settings);
            if !args.codemods.is_empty() {
                options.codemods = args.codemods;
            }
            options.format = !args.no_format;
            options.check = !args.no_check;
            migrate(&options, &typeshed)?
        }
        Commands::Check { roots } => {
            if !roots.is_empty() {
                settings.roots = roots;
            }
            check(&RunOptions::new(&cli.project, settings), &typeshed)?
        }
    };

    print!("{}", session.render_summary());
    Ok(ExitCode::from(session.exit_code() as u8))
}
