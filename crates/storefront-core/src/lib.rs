//! Core library for the storefront client.
//!
//! - `auth`: credential store, durable token storage and session operations
//! - `api`: REST client with bearer auth and refresh-and-retry
//! - `catalog`, `cart`: product browsing and the client-side cart
//! - `cache`: JSON file cache shared by the catalog and the cart
//! - `config`: user configuration

pub mod api;
pub mod auth;
pub mod cache;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError, ApiRequest, Notification};
pub use auth::{CredentialStore, ProfileLoad, Session};
pub use config::Config;
