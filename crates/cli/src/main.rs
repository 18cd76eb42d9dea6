//! Heritage Market CLI - catalog queries and role inspection.
//!
//! # Usage
//!
//! ```bash
//! # List every product from the configured store
//! hm-cli products list
//!
//! # Filter by culture or occasion
//! hm-cli products list --culture Yoruba
//! hm-cli products list --occasion wedding
//!
//! # Show one product
//! hm-cli products show p-aso-oke
//!
//! # Resolve a user's role
//! hm-cli role resolve u-8f2c
//!
//! # Run against a JSON seed instead of the configured store
//! hm-cli --seed seed.json products list
//! ```
//!
//! # Commands
//!
//! - `products list` - Query the catalog
//! - `products show` - Fetch one product
//! - `role resolve` - Show the stored role record and resolved role

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::products::ListFilter;

#[derive(Parser)]
#[command(name = "hm-cli")]
#[command(author, version, about = "Heritage Market CLI tools")]
struct Cli {
    /// Read from a JSON seed file instead of the configured store
    #[arg(long, global = true, value_name = "FILE")]
    seed: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the product catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Inspect user roles
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products, optionally filtered
    List {
        /// Only products for this culture (exact match)
        #[arg(long, conflicts_with = "occasion")]
        culture: Option<String>,

        /// Only products tagged with this occasion
        #[arg(long)]
        occasion: Option<String>,
    },
    /// Show a single product
    Show {
        /// Product id
        id: String,
    },
}

#[derive(Subcommand)]
enum RoleAction {
    /// Resolve the role for a user id
    Resolve {
        /// User id from the identity provider
        uid: String,
    },
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = commands::store_config(cli.seed.as_deref())?;
    let store = commands::connect(&config)?;

    match cli.command {
        Commands::Products { action } => match action {
            ProductsAction::List { culture, occasion } => {
                let filter = match (culture, occasion) {
                    (Some(culture), _) => ListFilter::Culture(culture),
                    (None, Some(occasion)) => ListFilter::Occasion(occasion),
                    (None, None) => ListFilter::All,
                };
                commands::products::list(store, &config, &filter).await?;
            }
            ProductsAction::Show { id } => {
                commands::products::show(store, &config, &id).await?;
            }
        },
        Commands::Role { action } => match action {
            RoleAction::Resolve { uid } => {
                commands::role::resolve(store, &config, &uid).await?;
            }
        },
    }
    Ok(())
}
