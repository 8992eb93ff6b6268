//! # Table Query Tool
//!
//! Describes a table or runs a JSON filter against it, printing JSON.
//!
//! ## Usage
//! ```bash
//! # Column descriptors of a table
//! cargo run -p tabula-db --bin tabula-query -- --db ./app.db --table users --describe
//!
//! # Rows matching a filter
//! cargo run -p tabula-db --bin tabula-query -- --db ./app.db --table users \
//!     --filter '{"groups":[{"name":"default","conditions":[{"field":"age","operator":"BT","value1":18,"value2":30}]}]}'
//!
//! # Row count only
//! cargo run -p tabula-db --bin tabula-query -- --db ./app.db --table users --count
//! ```
//!
//! Logs go to stderr (`RUST_LOG` controls the level); stdout carries only
//! the JSON result.

use std::env;
use std::path::PathBuf;

use tabula_core::{Criteria, DialectKind, EngineConfig, Filter};
use tabula_db::{DbConfig, Engine, SqliteHandle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tabula=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./tabula.db");
    let mut table: Option<String> = None;
    let mut filter_json: Option<String> = None;
    let mut fields: Vec<String> = Vec::new();
    let mut config_path: Option<PathBuf> = None;
    let mut describe = false;
    let mut count = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--table" | "-t" => {
                if i + 1 < args.len() {
                    table = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--filter" | "-f" => {
                if i + 1 < args.len() {
                    filter_json = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--fields" => {
                if i + 1 < args.len() {
                    fields = args[i + 1]
                        .split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(str::to_string)
                        .collect();
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--describe" => describe = true,
            "--count" => count = true,
            "--help" | "-h" => {
                println!("Tabula Table Query Tool");
                println!();
                println!("Usage: tabula-query --table <NAME> [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        SQLite database file (default: ./tabula.db)");
                println!("  -t, --table <NAME>     Table to query");
                println!("  -f, --filter <JSON>    Filter as JSON (default: all rows)");
                println!("      --fields <A,B>     Comma-separated field list (default: *)");
                println!("  -c, --config <PATH>    Engine config file (TOML)");
                println!("      --describe         Print column descriptors instead of rows");
                println!("      --count            Print the matching row count");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            other => {
                warn!(argument = %other, "Ignoring unknown argument");
            }
        }
        i += 1;
    }

    let Some(table) = table else {
        eprintln!("Missing --table <NAME>; see --help");
        std::process::exit(2);
    };

    let mut config = EngineConfig::load(config_path)?;
    if config.dialect != DialectKind::Sqlite {
        warn!(dialect = %config.dialect, "Only SQLite files are supported here, using sqlite");
        config = config.with_dialect(DialectKind::Sqlite);
    }

    let conn = SqliteHandle::open(DbConfig::new(&db_path)).await?;
    let engine = Engine::new(config)?;
    let handle = engine.table(&conn, &table).await?;

    if describe {
        println!("{}", serde_json::to_string_pretty(handle.metadata())?);
        conn.close().await;
        return Ok(());
    }

    let criteria = match filter_json {
        Some(json) => Criteria::Filter(serde_json::from_str::<Filter>(&json)?),
        None => Criteria::None,
    };

    if count {
        let total = handle.count(&conn, &criteria).await?;
        println!("{}", serde_json::json!({ "table": table, "total": total }));
    } else {
        let rows = handle.get_many(&conn, &criteria, &fields).await?;
        info!(table = %table, rows = rows.len(), "Query complete");
        println!("{}", serde_json::to_string_pretty(&rows)?);
    }

    conn.close().await;
    Ok(())
}
