use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "satchel")]
#[command(about = "Offline-first record sync for bookkeeping collections")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Work against the local cache only, without contacting the server
    #[arg(long, global = true)]
    pub offline: bool,

    /// Override the data directory holding the cache files
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List records in a collection
    List {
        /// Collection name (e.g. pembelian, penjualan)
        resource: String,
        /// Page to show (1-based)
        #[arg(long, default_value = "1")]
        page: usize,
        /// Rows per page
        #[arg(long, value_name = "N")]
        per_page: Option<usize>,
        /// Filter records by a search query
        #[arg(short, long, default_value = "")]
        search: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a record
    #[command(alias = "new")]
    Add {
        /// Collection name
        resource: String,
        /// Field assignment, repeatable (KEY=VALUE)
        #[arg(short = 'f', long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },
    /// Update an existing record
    Edit {
        /// Collection name
        resource: String,
        /// Record id (server id or provisional local_... id)
        id: String,
        /// Field assignment, repeatable (KEY=VALUE)
        #[arg(short = 'f', long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },
    /// Delete a record
    #[command(alias = "delete")]
    Rm {
        /// Collection name
        resource: String,
        /// Record id (server id or provisional local_... id)
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Field shown in the confirmation prompt
        #[arg(long, value_name = "FIELD")]
        label: Option<String>,
    },
    /// Replay pending rows and reconcile with the server
    Sync {
        /// Collection name
        resource: String,
    },
    /// Show cache and pending counts for a collection
    Status {
        /// Collection name
        resource: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Store the account email owning the records
    Login {
        /// Account email
        email: String,
        /// API base URL (e.g. https://api.example.com/api)
        #[arg(long, value_name = "URL")]
        api_url: Option<String>,
    },
    /// Clear the stored account email
    Logout,
}
