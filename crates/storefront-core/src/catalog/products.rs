use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::cache::CacheManager;
use crate::models::Product;

/// Where a product list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSource {
    Network,
    FreshCache,
    /// Network failed; serving whatever was cached last
    StaleCache,
    /// Network failed and nothing was cached
    Unavailable,
}

/// Product catalog backed by the API with a local cache.
pub struct Catalog<'a> {
    api: &'a ApiClient,
    cache: &'a CacheManager,
}

impl<'a> Catalog<'a> {
    pub fn new(api: &'a ApiClient, cache: &'a CacheManager) -> Self {
        Self { api, cache }
    }

    /// Serve a fresh cache when allowed, otherwise fetch and cache.
    /// A failed fetch falls back to the cache however old it is.
    pub async fn products(&self, force_refresh: bool) -> (Vec<Product>, ProductSource) {
        let cached = match self.cache.load_products() {
            Ok(cached) => cached,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable product cache");
                None
            }
        };

        if !force_refresh {
            if let Some(ref cached) = cached {
                if !cached.is_stale() {
                    debug!(count = cached.data.len(), "Serving products from cache");
                    return (cached.data.clone(), ProductSource::FreshCache);
                }
            }
        }

        match self.api.try_fetch_products().await {
            Ok(products) => {
                if let Err(e) = self.cache.save_products(&products) {
                    warn!(error = %e, "Failed to cache products");
                }
                (products, ProductSource::Network)
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch products");
                match cached {
                    Some(cached) => (cached.data, ProductSource::StaleCache),
                    None => (Vec::new(), ProductSource::Unavailable),
                }
            }
        }
    }
}
