//! ebl-server - batch commitment engine for the Evidence Batch Ledger

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ebl_server::classify::KeywordClassifier;
use ebl_server::{
    BlockBuilder, BlockQueryService, ClassifierConfig, LedgerError, SqliteStore, Storage,
};

#[derive(Parser, Debug)]
#[command(name = "ebl-server")]
#[command(about = "Batch commitment engine for the Evidence Batch Ledger")]
struct Args {
    /// Path to SQLite database
    #[arg(long, env = "EBL_DATABASE_PATH", default_value = "./ebl.db")]
    database: String,

    /// Log level
    #[arg(long, env = "EBL_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Actor recorded on batches and exports created by this invocation
    #[arg(long, env = "EBL_ACTOR_ID", default_value = "operator")]
    actor: String,

    /// Timeout per classifier call in milliseconds
    #[arg(long, env = "EBL_CLASSIFIER_TIMEOUT_MS", default_value = "2000")]
    classifier_timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Batch all pending records into a new block
    Create,
    /// Show what a create run would batch, without committing
    Preview,
    /// List committed batches, newest first
    List {
        #[arg(long, default_value = "20")]
        limit: u64,
        #[arg(long, default_value = "0")]
        offset: u64,
    },
    /// Show one batch with members and inclusion proofs
    Show { batch_number: u64 },
    /// Ledger-wide statistics
    Stats,
    /// Export a batch as an audit document
    Export { batch_number: u64 },
    /// Generate and check the inclusion proof for one record of a batch
    Verify { batch_number: u64, record_id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&args.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ebl-server v{}", env!("CARGO_PKG_VERSION"));

    let storage: Arc<dyn Storage> = Arc::new(SqliteStore::new(&args.database)?);
    let builder = Arc::new(BlockBuilder::new(
        storage,
        Arc::new(KeywordClassifier::default()),
        None,
        ClassifierConfig {
            timeout_ms: args.classifier_timeout_ms,
            ..Default::default()
        },
    ));
    let query = BlockQueryService::new(Arc::clone(&builder));

    match args.command {
        Command::Create => match builder.create_batch(&args.actor).await {
            Ok(receipt) => print_json(&receipt)?,
            Err(LedgerError::NoPendingRecords) => println!("nothing to batch"),
            Err(e) => return Err(e.into()),
        },
        Command::Preview => match builder.preview_batch().await {
            Ok(stats) => print_json(&stats)?,
            Err(LedgerError::NoPendingRecords) => println!("nothing to batch"),
            Err(e) => return Err(e.into()),
        },
        Command::List { limit, offset } => print_json(&query.list_batches(limit, offset)?)?,
        Command::Show { batch_number } => print_json(&query.get_batch_detail(batch_number)?)?,
        Command::Stats => print_json(&query.get_statistics()?)?,
        Command::Export { batch_number } => {
            print_json(&query.export_batch(batch_number, &args.actor)?)?
        }
        Command::Verify {
            batch_number,
            record_id,
        } => {
            let proof = query.membership_proof(batch_number, record_id)?;
            let valid = query.verify_membership(batch_number, record_id, &proof)?;
            println!(
                "record {} in batch {}: {}",
                record_id,
                batch_number,
                if valid { "proof valid" } else { "proof INVALID" }
            );
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
