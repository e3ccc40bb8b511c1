//! # Hoard CLI Module
//!
//! ## Available Commands
//!
//! - `serve` - Start the HTTP server
//! - `status` - Show record counts
//! - `init` - Create a new database
//! - `add-location` / `add-item` - Create records
//! - `show` - Show one record with its path and totals
//! - `list` - List top-level records or the children of one
//! - `delete` - Cascade-delete a record (requires `--yes`)
//! - `tags` / `rename-tag` / `delete-tag` - Tag maintenance
//! - `search` - Search names, descriptions, ids and tags
//! - `export` / `preview` / `import` - Archives
//! - `hash` - BLAKE3 digest of an archive or of the catalog

mod commands;

use crate::config::{Backend, HoardConfig};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use hoard_core::{EntityKind, HoardError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Hoard - home inventory
///
/// Keeps track of what you own and where it is: places nest in places,
/// things sit in places or inside other things.
#[derive(Parser, Debug)]
#[command(name = "hoard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ./hoard.toml when present)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the database (overrides config)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides config)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show record counts
    Status,

    /// Initialize a new empty database
    Init {
        /// Replace an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Create a Location
    AddLocation {
        /// Display name
        name: String,

        /// Label of the parent Location
        #[arg(short, long)]
        parent: Option<String>,

        /// Free-text description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Create an Item
    AddItem {
        /// Display name
        #[arg(short, long)]
        name: Option<String>,

        /// Label of the parent Location or container Item
        #[arg(short, long)]
        parent: Option<String>,

        /// Free-text description
        #[arg(short, long)]
        description: Option<String>,

        /// The Item can hold other Items
        #[arg(long)]
        container: bool,

        /// Number of units
        #[arg(short = 'n', long, default_value = "1", allow_negative_numbers = true)]
        quantity: i64,

        /// Leave this Item out of totals
        #[arg(long)]
        exclude: bool,

        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Purchase price, e.g. 19.99
        #[arg(long)]
        price: Option<String>,

        /// Current value, e.g. 12.50
        #[arg(long)]
        value: Option<String>,

        /// Acquisition date (YYYY-MM-DD)
        #[arg(long)]
        acquired: Option<NaiveDate>,
    },

    /// Show one record with its path and totals
    Show {
        /// Record label (id as printed, any case)
        label: String,
    },

    /// List top-level records, or the children of one record
    List {
        /// Label of the parent to list
        parent: Option<String>,

        /// Only this kind (location, item)
        #[arg(short, long)]
        kind: Option<EntityKind>,
    },

    /// Delete a record and everything inside it
    Delete {
        /// Record label
        label: String,

        /// Confirm the cascading delete
        #[arg(long)]
        yes: bool,
    },

    /// List tags by usage
    Tags,

    /// Rename a tag on every Item carrying it
    RenameTag {
        /// Current tag
        from: String,

        /// Replacement tag
        to: String,
    },

    /// Remove a tag from every Item
    DeleteTag {
        /// Tag to remove
        tag: String,
    },

    /// Search ids, names, descriptions and tags
    Search {
        /// Text to look for
        query: String,
    },

    /// Export the catalog to a zip archive
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Check an archive without importing it
    Preview {
        /// Archive path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Import an archive into the catalog
    Import {
        /// Archive path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Compute the BLAKE3 digest of an archive, or of the catalog contents
    Hash {
        /// Archive to hash (default: the catalog itself)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve configuration and run the selected command.
pub async fn execute(cli: Cli) -> Result<(), HoardError> {
    let mut config = HoardConfig::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database = database;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    let out = Output {
        json: cli.json_mode,
        verbose: cli.verbose,
    };

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            cmd_serve(&config).await
        }
        Some(Commands::Status) | None => cmd_status(&config, out),
        Some(Commands::Init { force }) => cmd_init(&config, force),
        Some(Commands::AddLocation {
            name,
            parent,
            description,
        }) => cmd_add_location(&config, out, name, parent.as_deref(), description),
        Some(Commands::AddItem {
            name,
            parent,
            description,
            container,
            quantity,
            exclude,
            tags,
            price,
            value,
            acquired,
        }) => cmd_add_item(
            &config,
            out,
            ItemArgs {
                name,
                parent,
                description,
                container,
                quantity,
                exclude,
                tags,
                price,
                value,
                acquired,
            },
        ),
        Some(Commands::Show { label }) => cmd_show(&config, out, &label),
        Some(Commands::List { parent, kind }) => cmd_list(&config, out, parent.as_deref(), kind),
        Some(Commands::Delete { label, yes }) => cmd_delete(&config, out, &label, yes),
        Some(Commands::Tags) => cmd_tags(&config, out),
        Some(Commands::RenameTag { from, to }) => cmd_rename_tag(&config, out, &from, &to),
        Some(Commands::DeleteTag { tag }) => cmd_delete_tag(&config, out, &tag),
        Some(Commands::Search { query }) => cmd_search(&config, out, &query),
        Some(Commands::Export { output }) => cmd_export(&config, out, &output),
        Some(Commands::Preview { input }) => cmd_preview(&config, out, &input),
        Some(Commands::Import { input }) => cmd_import(&config, out, &input),
        Some(Commands::Hash { input }) => cmd_hash(&config, out, input.as_deref()),
    }
}
