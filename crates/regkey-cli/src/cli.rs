use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "regkey",
    about = "regkey — read and write hive-rooted registry keys",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Use a JSON snapshot file instead of the system registry
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// TOML file with buffer sizes and limits
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the child keys of a key
    Keys(KeyArgs),
    /// List the value names of a key
    Values(KeyArgs),
    /// Read a string value (empty if absent)
    Get(ValueArgs),
    /// Write a string value, creating the key if needed
    Set(SetArgs),
    /// Delete an empty child key
    DeleteKey(ValueArgs),
    /// Delete a value
    DeleteValue(ValueArgs),
    /// Read JSON requests from stdin, one per line, and answer each on stdout
    Batch,
}

impl Command {
    /// Whether the command may change the store.
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Command::Set(_) | Command::DeleteKey(_) | Command::DeleteValue(_) | Command::Batch
        )
    }
}

#[derive(Args)]
pub struct KeyArgs {
    /// HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, HKEY_CLASSES_ROOT, HKEY_USERS or HKEY_CURRENT_CONFIG
    pub hive: String,
    /// Backslash-separated key path; empty for the hive root
    #[arg(default_value = "")]
    pub path: String,
}

#[derive(Args)]
pub struct ValueArgs {
    pub hive: String,
    pub path: String,
    pub name: String,
}

#[derive(Args)]
pub struct SetArgs {
    pub hive: String,
    pub path: String,
    pub name: String,
    pub value: String,
}
