//! strata-migrate CLI
//!
//! Compares declared models with a database schema snapshot and writes
//! SQL migrations.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use strata_migrate::prelude::*;

/// FK-aware SQL migrations from declared models.
#[derive(Parser)]
#[command(name = "strata-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SQL dialect (postgres, sqlite).
    #[arg(short, long, env = "STRATA_DIALECT", default_value = "postgres")]
    dialect: Dialect,

    /// Migrations directory.
    #[arg(short, long, env = "STRATA_MIGRATIONS_DIR", default_value = "migrations")]
    migrations_dir: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the two schemas come from.
#[derive(Args)]
struct SchemaInput {
    /// JSON file with the declared models.
    #[arg(long)]
    models: PathBuf,

    /// JSON file with the introspected database schema (empty if omitted).
    #[arg(long)]
    database: Option<PathBuf>,

    /// Database tables never reported as dropped.
    #[arg(long = "ignore", value_name = "TABLE")]
    ignore: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show detected schema changes.
    Diff {
        #[command(flatten)]
        input: SchemaInput,

        /// Print the diff as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print migration SQL without writing files.
    Sql {
        #[command(flatten)]
        input: SchemaInput,

        /// Show rollback SQL instead of forward SQL.
        #[arg(short, long)]
        reverse: bool,

        /// Fail on foreign key cycles instead of deferring.
        #[arg(long)]
        reject_cycles: bool,
    },

    /// Generate migration files from schema changes.
    MakeMigrations {
        #[command(flatten)]
        input: SchemaInput,

        /// Migration name/description.
        #[arg(short, long)]
        name: Option<String>,

        /// Fail on foreign key cycles instead of deferring.
        #[arg(long)]
        reject_cycles: bool,

        /// Show SQL without writing files (dry run).
        #[arg(long)]
        dry_run: bool,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))
}

fn load(input: &SchemaInput, dialect: Dialect) -> anyhow::Result<(ModelRegistry, SchemaDiff)> {
    let models: ModelRegistry = read_json(&input.models)?;
    let database = match &input.database {
        Some(path) => read_json(path)?,
        None => DatabaseSchema::new(),
    };
    let diff = SchemaComparator::new(dialect)
        .ignore_tables(input.ignore.iter().cloned())
        .compare(&models, &database)?;
    Ok((models, diff))
}

fn generator(dialect: Dialect, reject_cycles: bool) -> MigrationGenerator {
    let policy = if reject_cycles {
        CyclePolicy::Reject
    } else {
        CyclePolicy::Defer
    };
    MigrationGenerator::new(dialect).cycle_policy(policy)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Diff { input, json } => {
            let (_, diff) = load(&input, cli.dialect)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&diff)?);
            } else {
                println!("{}", diff.summary());
            }
        }

        Commands::Sql {
            input,
            reverse,
            reject_cycles,
        } => {
            let (models, diff) = load(&input, cli.dialect)?;
            let script = generator(cli.dialect, reject_cycles).generate(&diff, &models, "preview")?;
            if reverse {
                print!("{}", script.down);
            } else {
                print!("{}", script.up);
            }
        }

        Commands::MakeMigrations {
            input,
            name,
            reject_cycles,
            dry_run,
        } => {
            let (models, diff) = load(&input, cli.dialect)?;
            if diff.is_empty() {
                info!("No changes detected.");
                return Ok(());
            }

            let migration_name = name.unwrap_or_else(|| "auto".to_string());
            let script =
                generator(cli.dialect, reject_cycles).generate(&diff, &models, &migration_name)?;
            let writer = MigrationWriter::new(cli.migrations_dir.clone());
            let now = chrono::Utc::now();

            if dry_run {
                let files = writer.paths(&script, now);
                println!("Would create migration: {}", files.up.display());
                println!("\n{}", script.up);
                println!("Would create migration: {}", files.down.display());
                println!("\n{}", script.down);
            } else {
                info!("{}", diff.summary());
                let files = writer.write(&script, now)?;
                info!("Created migration: {}", files.up.display());
            }
        }
    }

    Ok(())
}
