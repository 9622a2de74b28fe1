use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tk_cli::commands::{add, edit, list, reconcile, remove, show, status, track};
use tk_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(tk_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = tk_db::Database::open(&config.database_path).with_context(|| {
        format!("failed to open database {}", config.database_path.display())
    })?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so command output stays clean on stdout.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let mut stdout = io::stdout().lock();

    match command {
        Commands::Add(args) => add::run(&mut stdout, args, &mut db)?,
        Commands::Edit(args) => edit::run(&mut stdout, args, &mut db)?,
        Commands::Rm { id } => remove::run(&mut stdout, *id, &mut db)?,
        Commands::List(args) => list::run(&mut stdout, args, &db)?,
        Commands::Show { id } => show::run(&mut stdout, *id, &db)?,
        Commands::History { id } => show::history(&mut stdout, *id, &db)?,
        Commands::Track => track::run(io::stdin().lock(), &mut stdout, &mut db)?,
        Commands::Status => status::run(&mut stdout, &db, &config.database_path)?,
        Commands::Reconcile => reconcile::run(&mut stdout, &mut db)?,
    }

    Ok(())
}
