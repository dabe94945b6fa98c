use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use vrl_sdk::Cursor;
use vrl_types::{DataType, RecordId, Timestamp};

#[derive(Parser)]
#[command(
    name = "vrl",
    about = "Versioned Record Ledger: append-only records with history and restore",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Database file, overriding the config file
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file
    #[arg(long, global = true, default_value = "vrl.toml")]
    pub config: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the config file and database
    Init(InitArgs),
    /// Write a new version of a record
    Write(WriteArgs),
    /// Show the latest version of a record
    Read(ReadArgs),
    /// Show every version of a record, newest first
    History(HistoryArgs),
    /// Mark a record deleted
    Delete(DeleteArgs),
    /// Re-append the version written at an exact time
    Restore(RestoreArgs),
    /// Page through current records, newest first
    Fetch(FetchArgs),
    /// Run a read statement over the history relation
    Query(QueryArgs),
    /// Check the current-existence index against history and repair it
    Reconcile(ReconcileArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct WriteArgs {
    pub data_type: DataType,
    /// JSON object body
    pub body: String,
    /// Existing record to version; a new id is generated when absent
    #[arg(long)]
    pub id: Option<RecordId>,
}

#[derive(Args)]
pub struct ReadArgs {
    pub data_type: DataType,
    pub id: RecordId,
}

#[derive(Args)]
pub struct HistoryArgs {
    pub id: RecordId,
}

#[derive(Args)]
pub struct DeleteArgs {
    pub data_type: DataType,
    pub id: RecordId,
}

#[derive(Args)]
pub struct RestoreArgs {
    pub data_type: DataType,
    pub id: RecordId,
    /// Exact version timestamp: RFC 3339 or microseconds since the epoch
    #[arg(long)]
    pub at: Timestamp,
}

#[derive(Args)]
pub struct FetchArgs {
    pub data_type: DataType,
    /// Page size; defaults to `default_page_size` from the config file
    #[arg(short = 'n', long)]
    pub first: Option<usize>,
    /// Cursor to continue after
    #[arg(long)]
    pub before: Option<Cursor>,
}

#[derive(Args)]
pub struct QueryArgs {
    pub sql: String,
    /// Positional argument, parsed as JSON or taken as a string
    #[arg(long = "arg")]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct ReconcileArgs {
    /// Report drift without repairing it
    #[arg(long)]
    pub dry_run: bool,
}
