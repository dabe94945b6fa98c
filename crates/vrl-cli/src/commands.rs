use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;
use vrl_ledger::{IndexReport, Ledger, Record};
use vrl_sdk::{Collection, Connection, Document, Entity};

use crate::cli::*;
use crate::config::CliConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        command,
        format,
        db,
        config: config_path,
        ..
    } = cli;
    let config = CliConfig::load_or_default(&config_path)?;

    if let Command::Init(args) = &command {
        return cmd_init(&config_path, &config, db, args, format);
    }

    let store = config.store_config(db);
    debug!(path = ?store.path, "opening ledger");
    let ledger = Ledger::open(&store).context("opening ledger")?;

    match command {
        Command::Init(_) => Ok(()),
        Command::Write(args) => cmd_write(&ledger, args, format),
        Command::Read(args) => cmd_read(&ledger, args, format),
        Command::History(args) => cmd_history(&ledger, args, format),
        Command::Delete(args) => cmd_delete(&ledger, args, format),
        Command::Restore(args) => cmd_restore(&ledger, args, format),
        Command::Fetch(args) => cmd_fetch(&ledger, &config, args, format),
        Command::Query(args) => cmd_query(&ledger, args, format),
        Command::Reconcile(args) => cmd_reconcile(&ledger, args, format),
    }
}

fn cmd_init(
    config_path: &Path,
    config: &CliConfig,
    db: Option<PathBuf>,
    args: &InitArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let wrote_config = if !config_path.exists() || args.force {
        std::fs::write(config_path, config.to_toml()?)
            .with_context(|| format!("writing {}", config_path.display()))?;
        true
    } else {
        false
    };

    let store = config.store_config(db);
    let ledger = Ledger::open(&store).context("creating ledger")?;
    let stats = ledger.store().stats()?;
    let db_name = store
        .path
        .as_ref()
        .map_or_else(|| ":memory:".to_string(), |p| p.display().to_string());

    match format {
        OutputFormat::Json => print_json(&json!({
            "config": config_path.display().to_string(),
            "config_written": wrote_config,
            "database": db_name,
            "stats": stats,
        })),
        OutputFormat::Text => {
            println!("{} Initialized ledger at {}", "✓".green().bold(), db_name.bold());
            if wrote_config {
                println!("  Config: {}", config_path.display().to_string().cyan());
            }
            println!(
                "  Versions: {}, current records: {}",
                stats.version_count.to_string().bold(),
                stats.index_count.to_string().bold()
            );
            Ok(())
        }
    }
}

fn cmd_write(ledger: &Ledger, args: WriteArgs, format: OutputFormat) -> anyhow::Result<()> {
    let body: Value = serde_json::from_str(&args.body).context("body is not valid JSON")?;
    let mut doc = Document::from_value(args.data_type.clone(), body)?;
    if let Some(id) = args.id {
        doc = doc.with_id(id);
    }
    let written = Collection::<Document>::with_data_type(ledger.clone(), args.data_type).write(&doc)?;

    match format {
        OutputFormat::Json => print_json(&written.to_json()),
        OutputFormat::Text => {
            println!(
                "{} Wrote {} {}",
                "✓".green().bold(),
                written.data_type(),
                id_text(&written).yellow()
            );
            println!("  Sequence: {}", written.meta().sequence);
            println!("  Modified: {}", written.meta().modified);
            Ok(())
        }
    }
}

fn cmd_read(ledger: &Ledger, args: ReadArgs, format: OutputFormat) -> anyhow::Result<()> {
    let record = ledger.read(&args.id, &args.data_type)?;
    let mut doc: Document = ledger.scan(&record)?;
    doc.set_data_type(&record.data_type);

    match format {
        OutputFormat::Json => {
            let mut value = doc.to_json();
            value["deleted"] = json!(record.is_tombstone());
            print_json(&value)
        }
        OutputFormat::Text => {
            println!("{} {}", doc.data_type(), id_text(&doc).yellow().bold());
            println!("  Sequence: {}", doc.meta().sequence);
            println!("  Created:  {}", doc.meta().created);
            println!("  Modified: {}", doc.meta().modified);
            if record.is_tombstone() {
                println!("  {}", "deleted".red());
            } else {
                println!("  {}", serde_json::to_string_pretty(doc.body())?);
            }
            Ok(())
        }
    }
}

fn cmd_history(ledger: &Ledger, args: HistoryArgs, format: OutputFormat) -> anyhow::Result<()> {
    let records: Vec<Record> = ledger.history(&args.id)?.collect();
    print_records(&records, format)
}

fn cmd_delete(ledger: &Ledger, args: DeleteArgs, format: OutputFormat) -> anyhow::Result<()> {
    let record = ledger.delete(&args.id, &args.data_type)?;
    match format {
        OutputFormat::Json => print_json(&record_json(&record)),
        OutputFormat::Text => {
            println!(
                "{} Deleted {} {}",
                "✓".green().bold(),
                record.data_type,
                record.id.to_string().yellow()
            );
            Ok(())
        }
    }
}

fn cmd_restore(ledger: &Ledger, args: RestoreArgs, format: OutputFormat) -> anyhow::Result<()> {
    let record = ledger.restore(&args.id, &args.data_type, args.at)?;
    match format {
        OutputFormat::Json => print_json(&record_json(&record)),
        OutputFormat::Text => {
            println!(
                "{} Restored {} {} from {}",
                "✓".green().bold(),
                record.data_type,
                record.id.to_string().yellow(),
                args.at.to_string().cyan()
            );
            println!("  New version: sequence {} at {}", record.sequence, record.timestamp);
            Ok(())
        }
    }
}

fn cmd_fetch(
    ledger: &Ledger,
    config: &CliConfig,
    args: FetchArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let first = args.first.unwrap_or(config.default_page_size);
    let docs = Collection::<Document>::with_data_type(ledger.clone(), args.data_type);
    let page: Connection<Document> = docs.fetch(first, args.before.as_ref())?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "edges": page.edges.iter().map(|e| json!({
                "cursor": e.cursor,
                "node": e.node.to_json(),
            })).collect::<Vec<_>>(),
            "page_info": page.page_info,
        })),
        OutputFormat::Text => {
            if page.is_empty() {
                println!("No current {} records.", docs.data_type());
                return Ok(());
            }
            for edge in &page.edges {
                println!(
                    "{}  {}  {}",
                    id_text(&edge.node).yellow(),
                    edge.node.meta().modified.to_string().dimmed(),
                    serde_json::to_string(edge.node.body())?
                );
            }
            let info = &page.page_info;
            println!(
                "\n{} of {} (newer: {}, older: {})",
                page.len(),
                info.total,
                yes_no(info.has_next_page),
                yes_no(info.has_previous_page)
            );
            if let (true, Some(cursor)) = (info.has_previous_page, &info.end_cursor) {
                println!("Next page: --before {}", cursor.to_string().cyan());
            }
            Ok(())
        }
    }
}

fn cmd_query(ledger: &Ledger, args: QueryArgs, format: OutputFormat) -> anyhow::Result<()> {
    let values: Vec<Value> = args.args.iter().map(|a| parse_arg(a)).collect();
    let records: Vec<Record> = ledger.query(&args.sql, &values)?.collect();
    print_records(&records, format)
}

fn cmd_reconcile(ledger: &Ledger, args: ReconcileArgs, format: OutputFormat) -> anyhow::Result<()> {
    let report: IndexReport = if args.dry_run {
        ledger.audit_index()?
    } else {
        ledger.reconcile_index()?
    };

    match format {
        OutputFormat::Json => print_json(&json!({
            "dry_run": args.dry_run,
            "report": report,
        })),
        OutputFormat::Text => {
            if report.is_consistent() {
                println!("{} Index matches history", "✓".green().bold());
                return Ok(());
            }
            let (add, remove) = if args.dry_run {
                ("unindexed:", "stale:")
            } else {
                ("indexed:", "unindexed:")
            };
            for entry in &report.missing {
                println!("  {} {} {}", add.green(), entry.data_type, entry.id);
            }
            for entry in &report.stale {
                println!("  {} {} {}", remove.red(), entry.data_type, entry.id);
            }
            Ok(())
        }
    }
}

/// `--arg` values are JSON when they parse as JSON, plain strings otherwise.
fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn record_json(record: &Record) -> Value {
    json!({
        "sequence": record.sequence,
        "id": record.id,
        "data_type": record.data_type,
        "timestamp": record.timestamp.to_rfc3339(),
        "deleted": record.is_tombstone(),
        "payload": record.payload_value().unwrap_or_else(|_| Value::String(record.payload.clone())),
    })
}

fn print_records(records: &[Record], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(&records.iter().map(record_json).collect::<Vec<_>>()),
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No versions.");
            }
            for record in records {
                let body = if record.is_tombstone() {
                    "deleted".red().to_string()
                } else {
                    record.payload.clone()
                };
                println!(
                    "{} {}  {} {}  {}",
                    format!("#{}", record.sequence).yellow(),
                    record.timestamp.to_string().dimmed(),
                    record.data_type,
                    record.id.short_id().cyan(),
                    body
                );
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn id_text(doc: &Document) -> String {
    doc.id().map(|id| id.to_string()).unwrap_or_default()
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
