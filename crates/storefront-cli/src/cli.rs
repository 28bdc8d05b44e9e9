//! Command line definition.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(version)]
#[command(about = "Browse the storefront catalog, manage your cart and your account")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in with email and password
    Login {
        /// Account email (prompted for when omitted)
        #[arg(long)]
        email: Option<String>,
    },

    /// Create a new account; the password is prompted for
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// Birth date, e.g. 1990-04-12 or 12/04/1990
        #[arg(long)]
        birth_date: String,
        /// Street, number, city
        #[arg(long)]
        address: String,
    },

    /// Show the logged in user's profile
    Profile {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Log out and forget the stored tokens
    Logout,

    /// Show login state and cache ages
    Status,

    /// List products with optional filters
    Products {
        /// Match against name and description
        #[arg(short, long)]
        search: Option<String>,

        /// Only this category ("All" for every category)
        #[arg(short, long)]
        category: Option<String>,

        #[arg(long, value_name = "PRICE")]
        min_price: Option<f64>,

        #[arg(long, value_name = "PRICE")]
        max_price: Option<f64>,

        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Ignore the product cache
        #[arg(long)]
        refresh: bool,

        /// Print the matching page as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single product
    Product {
        id: i64,
    },

    /// List product categories
    Categories,

    /// Manage the shopping cart
    Cart {
        #[command(subcommand)]
        command: CartCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum CartCommands {
    /// Show the cart contents
    Show,
    /// Add a product
    Add {
        id: i64,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product
    Remove {
        id: i64,
    },
    /// Set the quantity of a product (0 removes it)
    Set {
        id: i64,
        quantity: u32,
    },
    /// Empty the cart
    Clear,
    /// Buy everything in the cart
    Checkout,
}
