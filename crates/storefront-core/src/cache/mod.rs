//! Local caching module for offline data access.
//!
//! This module provides the `CacheManager` for storing and retrieving
//! storefront data locally. Data is cached in JSON format with a timestamp
//! and considered stale after 60 minutes.
//!
//! Cached data types include:
//! - The product catalog
//! - The shopping cart

pub mod manager;

pub use manager::{CacheAges, CacheManager, CachedData};
