//! # depotctl
//!
//! Operator CLI for the posting engine.
//!
//! ```text
//! depotctl migrate
//! depotctl post <document-id> [--actor NAME]
//! depotctl cancel <document-id> [--actor NAME]
//! depotctl available <warehouse-id> <variant-id>
//! depotctl balances <warehouse-id> [--category ID] [--sku SKU] [--min-qty N]
//! depotctl history <document-id>
//! ```
//!
//! Reads `DEPOT_DB_PATH` (default `depot.db`) and the `DEPOT_*` posting
//! settings. Logging follows `RUST_LOG`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use depot_core::{Amount, BalanceFilter};
use depot_db::{Database, DbConfig};
use depot_posting::{PostingConfig, PostingService};

#[derive(Parser)]
#[command(name = "depotctl", about = "Post, cancel and inspect warehouse documents", version)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "DEPOT_DB_PATH", default_value = "depot.db")]
    db: PathBuf,

    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// Post a draft document
    Post {
        document_id: String,
        #[arg(long)]
        actor: Option<String>,
    },
    /// Cancel a posted document
    Cancel {
        document_id: String,
        #[arg(long)]
        actor: Option<String>,
    },
    /// On hand minus reserved for a pair
    Available { warehouse_id: String, variant_id: String },
    /// Balances of a warehouse
    Balances {
        warehouse_id: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        sku: Option<String>,
        #[arg(long)]
        min_qty: Option<Amount>,
    },
    /// Transition history of a document
    History { document_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = PostingConfig::from_env().context("invalid posting configuration")?;
    let db = Database::new(DbConfig::new(cli.db.clone()))
        .await
        .with_context(|| format!("failed to open database {}", cli.db.display()))?;
    info!(path = %cli.db.display(), policy = %config.accounting_policy, "depotctl started");

    let service = PostingService::new(db.clone(), config);

    match cli.command {
        Commands::Migrate => {
            db.run_migrations().await.context("migration failed")?;
            println!("Database is up to date");
        }
        Commands::Post { document_id, actor } => {
            let doc = service
                .post_document(&document_id, actor.as_deref())
                .await
                .with_context(|| format!("failed to post {document_id}"))?;
            if cli.json {
                print_json(&doc)?;
            } else {
                println!("Posted {} as {}", doc.id, doc.number);
            }
        }
        Commands::Cancel { document_id, actor } => {
            let doc = service
                .cancel_document(&document_id, actor.as_deref())
                .await
                .with_context(|| format!("failed to cancel {document_id}"))?;
            if cli.json {
                print_json(&doc)?;
            } else {
                println!("Canceled {} ({})", doc.id, doc.number);
            }
        }
        Commands::Available { warehouse_id, variant_id } => {
            let available = service.available_quantity(&warehouse_id, &variant_id).await?;
            if cli.json {
                print_json(&available)?;
            } else {
                println!("{available}");
            }
        }
        Commands::Balances { warehouse_id, category, sku, min_qty } => {
            let filter = BalanceFilter {
                category_id: category,
                sku,
                min_qty,
            };
            let rows = service.list_balances(&warehouse_id, &filter).await?;
            if cli.json {
                print_json(&rows)?;
            } else {
                println!("{:<16} {:<32} {:>14} {:>14} {:>14}", "SKU", "PRODUCT", "ON HAND", "RESERVED", "AVAILABLE");
                for row in rows {
                    println!(
                        "{:<16} {:<32} {:>14} {:>14} {:>14}",
                        row.sku, row.product_name, row.quantity, row.reserved, row.available
                    );
                }
            }
        }
        Commands::History { document_id } => {
            let rows = service.document_history(&document_id).await?;
            if cli.json {
                print_json(&rows)?;
            } else {
                for row in rows {
                    let from = row.from_status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
                    println!(
                        "{}  {:>8} -> {:<8}  {:<12} {}",
                        row.timestamp.to_rfc3339(),
                        from,
                        row.to_status,
                        row.actor.as_deref().unwrap_or("-"),
                        row.note
                    );
                }
            }
        }
    }

    db.close().await;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,depot=debug,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
