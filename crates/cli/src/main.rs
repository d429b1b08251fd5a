//! Emporium CLI - Database migrations, tokens and a terminal cart driver.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! emporium-cli migrate
//!
//! # Issue a bearer token for user 42
//! emporium-cli token issue --user 42
//!
//! # Drive a cart (needs CART_API_TOKEN and CART_USER_ID)
//! emporium-cli cart add --product 7 --title "Espresso Beans" --price 14.50 --quantity 2
//! emporium-cli cart update --product 7 --quantity 3
//! emporium-cli cart checkout --street "1 Main St" --city Springfield --state IL --zip 62701 --country US
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `token issue` - Sign a bearer token
//! - `cart` - Show, change or check out the signed-in user's cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use emporium_core::{ProductId, ProductSnapshot, ShippingAddress};

use crate::commands::cart::{CartAction, parse_price};

mod commands;

#[derive(Parser)]
#[command(name = "emporium-cli")]
#[command(author, version, about = "Emporium CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage bearer tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Drive the signed-in user's cart
    Cart {
        #[command(subcommand)]
        action: CartCommand,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Issue a token for a user
    Issue {
        /// User ID the token authenticates
        #[arg(short, long)]
        user: i32,
    },
}

#[derive(Subcommand)]
enum CartCommand {
    /// Print the cart
    Show,
    /// Add a product (or increase its quantity)
    Add {
        #[arg(short, long)]
        product: i32,

        #[arg(short, long)]
        title: String,

        /// Unit price, e.g. 14.50
        #[arg(long, value_parser = parse_price)]
        price: Decimal,

        #[arg(long, default_value = "")]
        image: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (0 removes it)
    Update {
        #[arg(short, long)]
        product: i32,

        #[arg(short, long)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        #[arg(short, long)]
        product: i32,
    },
    /// Empty the cart
    Clear,
    /// Place an order for the whole cart
    Checkout {
        #[arg(long)]
        street: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        state: String,
        #[arg(long)]
        zip: String,
        #[arg(long)]
        country: String,
    },
    /// List placed orders, newest first
    Orders,
}

impl From<CartCommand> for CartAction {
    fn from(command: CartCommand) -> Self {
        match command {
            CartCommand::Show => Self::Show,
            CartCommand::Add {
                product,
                title,
                price,
                image,
                quantity,
            } => Self::Add {
                product: ProductSnapshot {
                    product_id: ProductId::new(product),
                    title,
                    unit_price: price,
                    image,
                },
                quantity,
            },
            CartCommand::Update { product, quantity } => Self::Update {
                product_id: ProductId::new(product),
                quantity,
            },
            CartCommand::Remove { product } => Self::Remove {
                product_id: ProductId::new(product),
            },
            CartCommand::Clear => Self::Clear,
            CartCommand::Checkout {
                street,
                city,
                state,
                zip,
                country,
            } => Self::Checkout {
                address: ShippingAddress {
                    street,
                    city,
                    state,
                    zip_code: zip,
                    country,
                },
            },
            CartCommand::Orders => Self::Orders,
        }
    }
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "emporium_cli=info,emporium_cart_client=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Token { action } => match action {
            TokenAction::Issue { user } => commands::token::issue(user)?,
        },
        Commands::Cart { action } => commands::cart::run(action.into()).await?,
    }
    Ok(())
}
