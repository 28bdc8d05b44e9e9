//! REST API client module for the storefront backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! storefront API: login, registration, profile, logout and products.
//!
//! Authenticated calls use JWT bearer tokens held in the shared
//! `CredentialStore`. A `401` triggers one token refresh and one retry.

pub mod client;
pub mod error;

pub use client::{ApiClient, ApiRequest};
pub use error::{ApiError, Notification};
