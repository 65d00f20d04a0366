//! Roastery CLI - terminal front end for the coffee-shop ordering client.
//!
//! The CLI plays the role of the ordering pages: it renders catalog and
//! cart views and forwards user actions into the cart session. Each
//! invocation is one interaction; the cart identity persists between
//! invocations through the configured state file.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! roastery products
//! roastery product 7
//!
//! # Work the cart
//! roastery cart show
//! roastery cart add 7
//! roastery cart increase 7
//! roastery cart remove 7
//!
//! # Place the order
//! roastery checkout --email jo@example.com --address "12 Bean St" --zip 04524
//!
//! # Admin console
//! roastery admin orders
//! roastery admin daily-batch
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use roastery_core::ProductId;

mod commands;
mod console;

use commands::Context;

#[derive(Parser)]
#[command(name = "roastery")]
#[command(author, version, about = "Roastery coffee ordering CLI")]
struct Cli {
    /// Answer yes to every confirmation prompt
    #[arg(long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the product catalog
    Products,
    /// Show one product in detail
    Product {
        /// Product identifier
        id: ProductId,
    },
    /// Inspect or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Validate checkout info and place the order
    Checkout {
        /// Customer email address
        #[arg(long)]
        email: String,

        /// Delivery address
        #[arg(long)]
        address: String,

        /// 5-digit postal code
        #[arg(long)]
        zip: String,
    },
    /// Discard the persisted cart identity
    Reset,
    /// Admin console
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the current cart summary
    Show,
    /// Add a product to the cart
    Add { product_id: ProductId },
    /// Remove a product from the cart
    Remove { product_id: ProductId },
    /// Increase a line's quantity by one
    Increase { product_id: ProductId },
    /// Decrease a line's quantity by one
    Decrease { product_id: ProductId },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Verify the configured admin credentials
    Login,
    /// List all orders
    Orders,
    /// Per-product aggregate quantities for the day
    DailyBatch,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::build(cli.yes)?;

    match cli.command {
        Commands::Products => commands::catalog::list(&ctx).await?,
        Commands::Product { id } => commands::catalog::show(&ctx, id).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&ctx).await?,
            CartAction::Add { product_id } => commands::cart::add(&ctx, product_id).await?,
            CartAction::Remove { product_id } => commands::cart::remove(&ctx, product_id).await?,
            CartAction::Increase { product_id } => {
                commands::cart::increase(&ctx, product_id).await?;
            }
            CartAction::Decrease { product_id } => {
                commands::cart::decrease(&ctx, product_id).await?;
            }
        },
        Commands::Checkout {
            email,
            address,
            zip,
        } => commands::checkout::place_order(&ctx, email, address, zip).await?,
        Commands::Reset => commands::cart::reset(&ctx)?,
        Commands::Admin { action } => match action {
            AdminAction::Login => commands::admin::login(&ctx).await?,
            AdminAction::Orders => commands::admin::orders(&ctx).await?,
            AdminAction::DailyBatch => commands::admin::daily_batch(&ctx).await?,
        },
    }
    Ok(())
}
