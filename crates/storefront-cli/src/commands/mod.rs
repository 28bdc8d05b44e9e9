//! CLI command handlers.

mod account;
mod cart;
mod catalog;

use std::sync::Arc;

use anyhow::{Context, Result};

use storefront_core::auth::open_storage;
use storefront_core::cache::CacheManager;
use storefront_core::catalog::Catalog;
use storefront_core::{ApiClient, ApiError, Config, CredentialStore, Notification, Session};

use crate::cli::{CartCommands, Cli, Commands};

/// Everything a command needs, built once per invocation
pub struct App {
    pub config: Config,
    pub session: Session,
    pub cache: CacheManager,
}

impl App {
    pub fn open(config: Config) -> Result<Self> {
        let cache_dir = config.cache_dir()?;
        let cache = CacheManager::new(cache_dir.clone())?;

        let storage = open_storage(config.storage, &cache_dir);
        let credentials = Arc::new(CredentialStore::with_storage(storage));
        let api = ApiClient::new(&config.api_base_url(), credentials)
            .context("Failed to create API client")?;

        Ok(Self {
            config,
            session: Session::new(api),
            cache,
        })
    }

    pub fn catalog(&self) -> Catalog<'_> {
        Catalog::new(self.session.api(), &self.cache)
    }
}

fn describe(notification: &Notification) -> String {
    format!("{}: {}", notification.title, notification.description)
}

/// Turn a library error into the message shown to the user
pub fn user_error(error: ApiError) -> anyhow::Error {
    anyhow::anyhow!(describe(&error.notification()))
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    let mut app = App::open(config)?;

    match cli.command {
        Commands::Login { email } => account::login(&mut app, email).await,
        Commands::Register {
            username,
            email,
            first_name,
            last_name,
            birth_date,
            address,
        } => {
            account::register(
                &app,
                account::RegisterArgs {
                    username,
                    email,
                    first_name,
                    last_name,
                    birth_date,
                    address,
                },
            )
            .await
        }
        Commands::Profile { json } => account::profile(&app, json).await,
        Commands::Logout => account::logout(&app).await,
        Commands::Status => account::status(&app),

        Commands::Products {
            search,
            category,
            min_price,
            max_price,
            page,
            refresh,
            json,
        } => {
            let query = storefront_core::catalog::ProductQuery {
                search,
                category,
                min_price,
                max_price,
                page: Some(page),
            };
            catalog::products(&app, &query, refresh, json).await
        }
        Commands::Product { id } => catalog::product(&app, id).await,
        Commands::Categories => catalog::categories(&app).await,

        Commands::Cart { command } => match command {
            CartCommands::Show => cart::show(&app),
            CartCommands::Add { id, quantity } => cart::add(&app, id, quantity).await,
            CartCommands::Remove { id } => cart::remove(&app, id),
            CartCommands::Set { id, quantity } => cart::set(&app, id, quantity),
            CartCommands::Clear => cart::clear(&app),
            CartCommands::Checkout => cart::checkout(&app),
        },
    }
}
