//! # archscan CLI
//!
//! ## Usage
//!
//! ```bash
//! archscan --config ./config/archscan.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `archscan init` | Create the SQLite database and run schema migrations |
//! | `archscan sources` | List configured sources and the location strategy |
//! | `archscan scrape` | Discover templates, optionally saving them |
//! | `archscan list` | Query stored architectures |
//! | `archscan serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! # Scan one repository subtree and print the documents as JSON
//! archscan scrape --source Azure/azure-quickstart-templates:quickstarts --limit 5 --json
//!
//! # Scan the configured sources and store the results
//! GITHUB_TOKEN=ghp_... archscan scrape --limit 50 --save
//!
//! # Largest architectures first
//! archscan list --sort-by resource_count --sort-dir desc
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `archscan=info`).

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use archscan::config::{self, Config};
use archscan::list::ListOptions;
use archscan::{db, list, migrate, scrape, server, sources};

const DEFAULT_CONFIG: &str = "./config/archscan.toml";

/// archscan: index ARM and Bicep quickstart templates from GitHub.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the default file does not exist, built-in defaults and
/// environment overrides are used.
#[derive(Parser)]
#[command(
    name = "archscan",
    about = "Discover ARM/Bicep quickstart templates on GitHub and index them",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the `architectures` table.
    /// Running it again is safe.
    Init,

    /// List configured sources and how templates will be located.
    Sources,

    /// Discover templates across the configured (or given) sources.
    Scrape {
        /// Maximum number of documents; defaults to `[scrape].default_limit`.
        #[arg(long)]
        limit: Option<usize>,

        /// Source to scan, `owner/repo[:subdir]`. Repeatable; replaces the
        /// configured list.
        #[arg(long = "source")]
        sources: Vec<String>,

        /// Upsert the documents into the configured database.
        #[arg(long)]
        save: bool,

        /// Print the documents as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Query stored architectures.
    List {
        /// Case-insensitive substring of the name.
        #[arg(long)]
        q: Option<String>,

        /// Only architectures with at least this many distinct resource types.
        #[arg(long)]
        min_resources: Option<usize>,

        /// `name` or `resource_count`.
        #[arg(long, default_value = "name")]
        sort_by: String,

        /// `asc` or `desc`.
        #[arg(long, default_value = "asc")]
        sort_dir: String,

        #[arg(long, default_value_t = 0)]
        skip: usize,

        #[arg(long, default_value_t = 25)]
        limit: usize,

        /// Print the documents as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve {
        /// Override the bind address.
        #[arg(long)]
        bind: Option<String>,
    },
}

fn load(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG) {
        tracing::debug!(path = %path.display(), "no config file; using defaults");
        let cfg = Config::minimal();
        cfg.validate()?;
        return Ok(cfg);
    }
    config::load_config(path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("archscan=info,warn"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let cli = Cli::parse();
    let mut cfg = load(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(db::require(&cfg)?).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Scrape {
            limit,
            sources,
            save,
            json,
        } => {
            scrape::run_scrape(&cfg, limit, sources, save, json).await?;
        }
        Commands::List {
            q,
            min_resources,
            sort_by,
            sort_dir,
            skip,
            limit,
            json,
        } => {
            let options = ListOptions {
                q,
                min_resources,
                sort_by,
                sort_dir,
                skip,
                limit,
            };
            list::run_list(&cfg, &options, json).await?;
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
