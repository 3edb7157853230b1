//! ghmeta CLI entry point.

use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use tracing::info;

use ghmeta::cli::{Cli, Commands, SyncArgs};
use ghmeta::client::{Api, GithubClient};
use ghmeta::error::Result;
use ghmeta::store::{ConsoleStore, SqliteStore, Store};
use ghmeta::sync::Downloader;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Sync(args) => sync(args),

        Commands::SetCurrent { db, version } => {
            let mut store = SqliteStore::open(db)?;
            store.set_active_version(version)?;
            println!("active views now expose snapshot {version}");
            Ok(())
        }

        Commands::Cleanup { db, version } => {
            let mut store = SqliteStore::open(db)?;
            store.cleanup(version)?;
            println!("retired all rows outside snapshot {version}");
            Ok(())
        }

        Commands::Limits { token } => {
            let client = GithubClient::new(token.clone())?;
            println!("remaining GraphQL quota: {}", client.rate_remaining()?);
            Ok(())
        }
    }
}

fn sync(args: &SyncArgs) -> Result<()> {
    let api = GithubClient::new(args.token.clone())?;

    let store: Box<dyn Store> = match &args.db {
        Some(path) => Box::new(SqliteStore::open(path)?),
        None => {
            info!("no database given; printing entities to stdout");
            Box::new(ConsoleStore)
        }
    };

    let version = args
        .version
        .clone()
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%d %H:%M:%S").to_string());

    let mut downloader = Downloader::new(api, store, args.page_size);
    downloader.download_repository(&args.owner, &args.name, &version)?;

    // Promote only after the whole traversal committed.
    downloader.set_current(&version)?;

    println!(
        "snapshot {version} complete for {}/{}",
        args.owner, args.name
    );
    Ok(())
}
