//! AtlasKV Store inspector
//!
//! Command-line tool for looking into (and poking at) a store directory.

use std::process::ExitCode;

use atlaskv_store::journal::JournalRecovery;
use atlaskv_store::storage::{HeaderFile, StoreHeader, HEADER_FILENAME, JOURNAL_FILENAME};
use atlaskv_store::{CollectionKind, Config, Store};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// AtlasKV Store inspector
#[derive(Parser, Debug)]
#[command(name = "atlaskv-inspect")]
#[command(about = "Inspect and edit an AtlasKV store directory")]
#[command(version)]
struct Args {
    /// Store directory
    #[arg(short, long, default_value = "./atlaskv_store")]
    path: String,

    /// Refuse to open a store whose header checksum is invalid
    #[arg(long)]
    strict_header: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List collections and their sizes
    List,

    /// Print every entry of a collection
    Dump {
        /// Collection name
        collection: String,
    },

    /// Get a value from a hash collection
    Get {
        collection: String,
        key: String,
    },

    /// Set a value in a hash collection and commit
    Put {
        collection: String,
        key: String,
        value: String,
    },

    /// Add a member to an ordered set and commit
    Add {
        collection: String,
        member: String,
    },

    /// Fold the journal into a new snapshot
    Checkpoint,

    /// Check header and journal integrity without modifying anything
    Verify,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> atlaskv_store::Result<()> {
    if let Commands::Verify = args.command {
        return verify(&args.path);
    }

    let config = Config::builder()
        .path(&args.path)
        .checksum_header_bypass(!args.strict_header)
        .build();
    let store = Store::open(config)?;

    match args.command {
        Commands::List => {
            for (name, kind) in store.collections()? {
                let size = match kind {
                    CollectionKind::Hash => store.hash(&name)?.size()?,
                    CollectionKind::OrderedSet => store.ordered_set(&name)?.size()?,
                };
                println!("{:<32} {:<12} {}", name, kind.to_string(), size);
            }
        }
        Commands::Dump { collection } => {
            let kind = store
                .collections()?
                .into_iter()
                .find(|(name, _)| *name == collection)
                .map(|(_, kind)| kind)
                .ok_or_else(|| atlaskv_store::AtlasError::CollectionNotFound(collection.clone()))?;
            match kind {
                CollectionKind::Hash => {
                    for (key, value) in store.hash(&collection)?.entries()? {
                        println!("{}\t{}", key, value);
                    }
                }
                CollectionKind::OrderedSet => {
                    for member in store.ordered_set(&collection)?.iter() {
                        println!("{}", member?);
                    }
                }
            }
        }
        Commands::Get { collection, key } => match store.hash(&collection)?.get(&key)? {
            Some(value) => println!("{}", value),
            None => println!("(absent)"),
        },
        Commands::Put {
            collection,
            key,
            value,
        } => {
            let replaced = store.hash(&collection)?.put(key, value)?;
            store.commit()?;
            println!("{}", if replaced { "replaced" } else { "inserted" });
        }
        Commands::Add { collection, member } => {
            let added = store.ordered_set(&collection)?.add(member)?;
            store.commit()?;
            println!("{}", if added { "added" } else { "already present" });
        }
        Commands::Checkpoint => {
            let generation = store.checkpoint()?;
            println!("snapshot generation {}", generation);
        }
        // Handled before opening
        Commands::Verify => {}
    }

    store.close()
}

fn verify(path: &str) -> atlaskv_store::Result<()> {
    let dir = std::path::Path::new(path);

    match StoreHeader::read(&dir.join(HEADER_FILENAME), true)? {
        HeaderFile::Present(header, status) => println!(
            "header: {:?}, generation {}, last_seq {}",
            status, header.generation, header.last_seq
        ),
        HeaderFile::Unreadable { len } => println!("header: unreadable ({} bytes)", len),
        HeaderFile::Missing => println!("header: missing"),
    }

    let journal = dir.join(JOURNAL_FILENAME);
    if journal.exists() {
        let result = JournalRecovery::verify(&journal)?;
        println!(
            "journal: {} records, last_lsn {}, {} bytes valid, {} bytes damaged",
            result.records_recovered, result.last_lsn, result.valid_len, result.bytes_discarded
        );
    } else {
        println!("journal: missing");
    }
    Ok(())
}
