mod commands;
mod config;
mod logging;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use commands::migrate;
use config::CliConfig;

#[derive(Parser)]
#[command(name = "spanner-orm")]
#[command(about = "Generate, apply and roll back Spanner schema migrations")]
struct Cli {
    /// Settings file (defaults to ./spanner-orm.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new migration file
    Generate {
        /// Name of the migration
        name: String,

        /// Directory holding migration files
        #[arg(long)]
        directory: Option<PathBuf>,
    },

    /// Apply pending migrations
    Migrate {
        /// Instance containing the database
        instance: String,

        /// Database to migrate
        database: String,

        /// Stop after this migration has been applied
        #[arg(long)]
        name: Option<String>,

        /// Directory holding migration files
        #[arg(long)]
        directory: Option<PathBuf>,
    },

    /// Show which migrations have been applied
    Showmigrations {
        /// Instance containing the database
        instance: String,

        /// Database to inspect
        database: String,

        /// Directory holding migration files
        #[arg(long)]
        directory: Option<PathBuf>,
    },

    /// Roll back applied migrations
    Rollback {
        /// Instance containing the database
        instance: String,

        /// Database to roll back
        database: String,

        /// Roll back down to and including this migration
        name: String,

        /// Directory holding migration files
        #[arg(long)]
        directory: Option<PathBuf>,
    },
}

async fn run(config: Option<PathBuf>, command: Commands) -> anyhow::Result<()> {
    let config = CliConfig::load(config.as_deref())?;
    logging::init_logging(&config)?;

    match command {
        Commands::Generate { name, directory } => {
            migrate::generate(&config, &name, directory.as_deref())?;
        }
        Commands::Migrate {
            instance,
            database,
            name,
            directory,
        } => {
            migrate::migrate(
                &config,
                &instance,
                &database,
                name.as_deref(),
                directory.as_deref(),
            )
            .await?;
        }
        Commands::Showmigrations {
            instance,
            database,
            directory,
        } => {
            migrate::show(&config, &instance, &database, directory.as_deref()).await?;
        }
        Commands::Rollback {
            instance,
            database,
            name,
            directory,
        } => {
            migrate::rollback(&config, &instance, &database, &name, directory.as_deref())
                .await?;
        }
    }
    Ok(())
}

/// Report a failed command on stderr and map the outcome to the exit status
fn exit_code(result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Print help when no command is given, otherwise run it
async fn execute(cli: Cli) -> ExitCode {
    let Some(command) = cli.command else {
        return exit_code(Cli::command().print_help().map_err(Into::into));
    };
    exit_code(run(cli.config, command).await)
}

#[tokio::main]
async fn main() -> ExitCode {
    execute(Cli::parse()).await
}
