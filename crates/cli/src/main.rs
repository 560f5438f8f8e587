//! TechShop CLI - Seeding and store operations against a local data file.
//!
//! # Usage
//!
//! ```bash
//! # Load the bundled demo catalog into techshop-data.json
//! techshop seed --reset
//!
//! # Browse the catalog
//! techshop catalog search --query iphone --sort price_asc
//!
//! # Work with a customer's cart
//! techshop --email anna@example.com --password user123 cart add iphone-15-pro -q 2
//! techshop --email anna@example.com --password user123 cart list
//!
//! # Place an order
//! techshop --email anna@example.com --password user123 orders place --express
//! ```
//!
//! # Commands
//!
//! - `seed` - Load fixture data
//! - `cart` - List and edit the signed-in user's cart
//! - `favorites` - List and toggle favorites
//! - `catalog search` - Filter and sort products
//! - `orders` - List and place orders
//! - `admin` - Dashboard and order status (manager or admin accounts)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use techshop_core::{OrderStatus, PaymentMethod};
use techshop_storefront::catalog::SortBy;
use techshop_storefront::config::StorefrontConfig;
use techshop_storefront::{AppState, StorefrontError};

mod commands;

use commands::Credentials;

#[derive(Parser)]
#[command(name = "techshop")]
#[command(author, version, about = "TechShop CLI tools")]
struct Cli {
    /// JSON data file (overrides `TECHSHOP_DATA_PATH`)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Email to sign in with
    #[arg(long, global = true)]
    email: Option<String>,

    /// Password to sign in with
    #[arg(long, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load categories, brands, products and demo accounts
    Seed {
        /// YAML fixture file (defaults to the bundled catalog)
        #[arg(short, long)]
        fixture: Option<PathBuf>,

        /// Delete existing data first
        #[arg(long)]
        reset: bool,
    },
    /// Manage the signed-in user's cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the signed-in user's favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Browse products
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// List and place orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Store management
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and totals
    List,
    /// Add a product
    Add {
        product: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product's line
    Remove { product: String },
    /// Set a line's quantity (0 or less removes it)
    Set {
        product: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// Show favorite products
    List,
    /// Add or remove a favorite
    Toggle { product: String },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Filter and sort visible products
    Search {
        #[arg(short, long)]
        query: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        brand: Option<String>,
        #[arg(long)]
        min: Option<Decimal>,
        #[arg(long)]
        max: Option<Decimal>,
        /// `price_asc`, `price_desc`, `popularity`, `rating` or `newest`
        #[arg(long, default_value = "newest")]
        sort: SortBy,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// Show the signed-in user's orders
    List,
    /// Order everything in the cart
    Place {
        /// Delivery address id (defaults to the default address)
        #[arg(long)]
        address: Option<String>,
        #[arg(long, value_enum, default_value_t = PaymentArg::Card)]
        payment: PaymentArg,
        /// Express delivery
        #[arg(long)]
        express: bool,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Show store totals
    Stats,
    /// Move an order to a new status
    OrderStatus {
        order: String,
        /// `new`, `processing`, `paid`, `shipping`, `delivered` or `cancelled`
        status: OrderStatus,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PaymentArg {
    Card,
    Cash,
    Online,
}

impl From<PaymentArg> for PaymentMethod {
    fn from(arg: PaymentArg) -> Self {
        match arg {
            PaymentArg::Card => Self::Card,
            PaymentArg::Cash => Self::Cash,
            PaymentArg::Online => Self::Online,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("techshop_storefront=info,techshop_cli=info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Command failed: {}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), StorefrontError> {
    let mut config = StorefrontConfig::from_env()?;
    if let Some(data) = cli.data {
        config.data_path = data;
    }
    let state = AppState::open(config).await?;
    let credentials = Credentials {
        email: cli.email,
        password: cli.password,
    };

    match cli.command {
        Commands::Seed { fixture, reset } => {
            commands::seed::run(&state, fixture.as_deref(), reset).await?;
        }
        Commands::Cart { action } => {
            let (_, mut session) = commands::sign_in(&state, &credentials).await?;
            match action {
                CartAction::List => commands::cart::list(&session),
                CartAction::Add { product, quantity } => {
                    commands::cart::add(&state, &mut session, &product, quantity).await?;
                }
                CartAction::Remove { product } => {
                    commands::cart::remove(&mut session, &product).await?;
                }
                CartAction::Set { product, quantity } => {
                    commands::cart::set(&state, &mut session, &product, quantity).await?;
                }
                CartAction::Clear => commands::cart::clear(&mut session).await?,
            }
        }
        Commands::Favorites { action } => {
            let (_, mut session) = commands::sign_in(&state, &credentials).await?;
            match action {
                FavoritesAction::List => commands::favorites::list(&state, &session).await?,
                FavoritesAction::Toggle { product } => {
                    commands::favorites::toggle(&mut session, &product).await?;
                }
            }
        }
        Commands::Catalog { action } => match action {
            CatalogAction::Search {
                query,
                category,
                brand,
                min,
                max,
                sort,
            } => {
                let filters = commands::catalog::filters(query, category, brand, min, max, sort);
                commands::catalog::search(&state, &filters).await?;
            }
        },
        Commands::Orders { action } => {
            let (user, mut session) = commands::sign_in(&state, &credentials).await?;
            match action {
                OrdersAction::List => commands::orders::list(&state, &user).await?,
                OrdersAction::Place {
                    address,
                    payment,
                    express,
                } => {
                    commands::orders::place(
                        &state,
                        &mut session,
                        &user,
                        address,
                        payment.into(),
                        express,
                    )
                    .await?;
                }
            }
        }
        Commands::Admin { action } => {
            let (user, _) = commands::sign_in(&state, &credentials).await?;
            match action {
                AdminAction::Stats => commands::orders::stats(&state, &user).await?,
                AdminAction::OrderStatus { order, status } => {
                    commands::orders::set_status(&state, &user, &order, status).await?;
                }
            }
        }
    }
    Ok(())
}
