//! # Tool Harvest CLI (`harvest`)
//!
//! ## Usage
//!
//! ```bash
//! harvest --config ./config/harvest.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `harvest init` | Create the SQLite database and schema |
//! | `harvest sources` | List configured sources |
//! | `harvest crawl <source>` | Crawl a source and reconcile it into the catalog |
//! | `harvest demo` | Load the bundled demo dataset |
//! | `harvest stats` | Catalog totals by category and pricing |
//! | `harvest list` | Filtered, paginated tool listing |
//! | `harvest get <id>` | Show one tool |
//! | `harvest clear --yes` | Delete the whole catalog |
//! | `harvest serve` | Start the read-only HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! harvest init
//! harvest crawl futuretools --limit 50 --dry-run
//! harvest crawl futuretools
//! harvest list --category Writing --pricing freemium
//! harvest serve
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tool_harvest::crawl::RunOptions;
use tool_harvest::{clear, config, crawl, demo, get, list, migrate, server, sources, stats};
use tool_harvest_core::store::DEFAULT_PAGE_LIMIT;

/// Tool Harvest: crawl AI tool directories into a local catalog.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/harvest.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "harvest",
    about = "Tool Harvest — crawl AI tool directories into a local SQLite catalog",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/harvest.toml")]
    config: PathBuf,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// List available sources.
    Sources,

    /// Crawl a source: load the listing, extract, normalize, and upsert.
    Crawl {
        /// Source name, e.g. `futuretools`.
        source: String,

        /// Keep only the first N extracted tools.
        #[arg(long)]
        limit: Option<usize>,

        /// Extract and preview without writing to the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Reconcile the bundled demo dataset.
    Demo {
        #[arg(long)]
        dry_run: bool,
    },

    /// Show catalog statistics.
    Stats,

    /// List tools with optional filters.
    List {
        /// Case-insensitive substring of name or description.
        #[arg(long)]
        search: Option<String>,

        /// Exact category name.
        #[arg(long)]
        category: Option<String>,

        /// One of free, paid, freemium, contact.
        #[arg(long)]
        pricing: Option<String>,

        /// Match tools carrying any of these tags. Repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,

        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: i64,

        #[arg(long, default_value_t = 0)]
        offset: i64,
    },

    /// Show one tool by ID.
    Get {
        /// Tool UUID.
        id: String,
    },

    /// Delete every tool and category.
    Clear {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },

    /// Start the read-only HTTP API on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = format!(
        "warn,tool_harvest={0},tool_harvest_core={0}",
        cli.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Crawl {
            source,
            limit,
            dry_run,
        } => {
            crawl::run_crawl(&cfg, &source, RunOptions { limit, dry_run }).await?;
        }
        Commands::Demo { dry_run } => {
            demo::run_demo(&cfg, dry_run).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::List {
            search,
            category,
            pricing,
            tags,
            limit,
            offset,
        } => {
            let query = list::build_query(search, category, pricing.as_deref(), tags, limit, offset)?;
            list::run_list(&cfg, &query).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, &id).await?;
        }
        Commands::Clear { yes } => {
            clear::run_clear(&cfg, yes).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
