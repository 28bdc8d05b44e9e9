//! Data models for storefront entities.
//!
//! This module contains the data structures exchanged with the backend:
//!
//! - `UserProfile`, `RegisterData`: account data
//! - `TokenPair`, `LoginRequest`, `RefreshRequest`: authentication payloads
//! - `Product`: catalog entries

pub mod product;
pub mod user;

pub use product::Product;
pub use user::{LoginRequest, RefreshRequest, RegisterData, TokenPair, UserProfile};
