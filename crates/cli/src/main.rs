mod error_presentation;
mod target;

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use sqlsync_core::{ConnectionConfig, read_schema_from_catalog};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    error_presentation::{CliError, CliResult, render_runtime_error},
    target::{make_target, write_sources},
};

/// Rewrites SQL schema files so that they match the schema of a SQLite
/// database, keeping comments and formatting of unchanged statements.
#[derive(Debug, Parser)]
#[command(name = "sqlsync", version)]
struct Cli {
    /// Path of the SQLite database to read the schema from.
    database: String,
    /// A `.sql` file, or a directory holding one file per object.
    target: PathBuf,
    /// Report which files would change without writing them.
    #[arg(long)]
    dry_run: bool,
    /// Log every schema edit.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let code = error.exit_code();
            eprintln!("{}", render_runtime_error(error));
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose { "sqlsync=debug" } else { "sqlsync=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> CliResult<()> {
    let target = make_target(&cli.target)?;

    let adapter = sqlsync_sqlite::connect(&ConnectionConfig::new(cli.database.as_str()))
        .map_err(CliError::Catalog)?;
    let desired = read_schema_from_catalog(adapter.as_ref());
    adapter.close().map_err(CliError::Catalog)?;
    let desired = desired.map_err(CliError::Catalog)?;

    let mut current = target.read_schema()?;
    let placement = target.placement();
    current.update_schema(&desired, |object| placement.source_for(object))?;

    let changed = current.take_changed_sources();
    let paths = write_sources(&current, &changed, cli.dry_run)?;
    if paths.is_empty() {
        println!("schema files are up to date");
    }
    for path in &paths {
        if cli.dry_run {
            println!("would update {}", path.display());
        } else {
            println!("updated {}", path.display());
        }
    }
    info!(
        files = paths.len(),
        dry_run = cli.dry_run,
        "finished synchronizing schema files"
    );
    Ok(())
}
