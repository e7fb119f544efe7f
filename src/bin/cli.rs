//! cfkv CLI
//!
//! Opens a data directory and runs one raw API command against it.

use std::process::ExitCode;
use std::sync::Arc;

use cfkv::config::WalSyncStrategy;
use cfkv::server::{RawDeleteRequest, RawGetRequest, RawPutRequest, RawScanRequest};
use cfkv::{Config, Server, StandaloneStorage, Storage};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// cfkv CLI
#[derive(Parser, Debug)]
#[command(name = "cfkv")]
#[command(about = "Column-family key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./cfkv_data")]
    data_dir: String,

    /// Column families to register (comma separated)
    #[arg(long, value_delimiter = ',', default_value = "default,lock,write")]
    column_families: Vec<String>,

    /// fsync the WAL after every commit
    #[arg(long)]
    sync: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// Column family
        cf: String,

        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// Column family
        cf: String,

        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Delete {
        /// Column family
        cf: String,

        /// The key to delete
        key: String,
    },

    /// List up to `limit` pairs starting at `start`
    Scan {
        /// Column family
        cf: String,

        /// First key to return (inclusive)
        #[arg(default_value = "")]
        start: String,

        /// Maximum number of pairs
        #[arg(short, long, default_value = "100")]
        limit: u32,
    },

    /// Fold the WAL into a checkpoint
    Checkpoint,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cfkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("cfkv v{}", cfkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);

    let strategy = if args.sync {
        WalSyncStrategy::EveryWrite
    } else {
        WalSyncStrategy::EveryNEntries { count: 100 }
    };
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .column_families(args.column_families.clone())
        .wal_sync_strategy(strategy)
        .build();

    let storage = match StandaloneStorage::new(config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to open storage: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = run(&storage, args.command);

    if let Err(e) = storage.stop() {
        tracing::error!("Failed to close storage: {}", e);
        return ExitCode::FAILURE;
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(storage: &Arc<StandaloneStorage>, command: Commands) -> cfkv::Result<()> {
    let server = Server::new(Arc::clone(storage));

    match command {
        Commands::Get { cf, key } => {
            let resp = server.raw_get(RawGetRequest {
                cf,
                key: key.into_bytes(),
            })?;
            if resp.not_found {
                println!("(not found)");
            } else {
                println!("{}", String::from_utf8_lossy(&resp.value));
            }
        }
        Commands::Put { cf, key, value } => {
            server.raw_put(RawPutRequest {
                cf,
                key: key.into_bytes(),
                value: value.into_bytes(),
            })?;
            println!("OK");
        }
        Commands::Delete { cf, key } => {
            server.raw_delete(RawDeleteRequest {
                cf,
                key: key.into_bytes(),
            })?;
            println!("OK");
        }
        Commands::Scan { cf, start, limit } => {
            let resp = server.raw_scan(RawScanRequest {
                cf,
                start_key: start.into_bytes(),
                limit,
            })?;
            for kv in resp.kvs {
                println!(
                    "{}\t{}",
                    String::from_utf8_lossy(&kv.key),
                    String::from_utf8_lossy(&kv.value)
                );
            }
        }
        Commands::Checkpoint => {
            let count = storage.engine().checkpoint()?;
            println!("checkpointed {} entries", count);
        }
    }

    Ok(())
}
