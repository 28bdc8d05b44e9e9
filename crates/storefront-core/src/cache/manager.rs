use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::cart::Cart;
use crate::models::Product;

/// Cached products older than this are refetched when the backend is reachable
const STALE_AFTER_MINUTES: i64 = 60;

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;

/// Files kept in the cache directory
#[derive(Debug, Clone, Copy)]
enum CacheFile {
    Products,
    Cart,
}

impl CacheFile {
    fn name(self) -> &'static str {
        match self {
            CacheFile::Products => "products",
            CacheFile::Cart => "cart",
        }
    }
}

/// A cached value and when it was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

/// Integer division rounding halves up
fn round_div(value: i64, unit: i64) -> i64 {
    (value + unit / 2) / unit
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    /// Time since the value was written; negative if the clock moved back
    pub fn age(&self) -> Duration {
        Utc::now() - self.cached_at
    }

    /// Short relative age such as "5m ago", "2h ago" or "3d ago"
    pub fn age_display(&self) -> String {
        match self.age().num_minutes() {
            m if m < 1 => "just now".to_string(),
            m if m < MINUTES_PER_HOUR => format!("{}m ago", m),
            m if m < MINUTES_PER_DAY => format!("{}h ago", round_div(m, MINUTES_PER_HOUR)),
            m => format!("{}d ago", round_div(m, MINUTES_PER_DAY)),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age() > Duration::minutes(STALE_AFTER_MINUTES)
    }
}

/// JSON file cache for the product catalog and the cart.
pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    fn path_of(&self, file: CacheFile) -> PathBuf {
        self.cache_dir.join(format!("{}.json", file.name()))
    }

    fn read<T: DeserializeOwned>(&self, file: CacheFile) -> Result<Option<CachedData<T>>> {
        let contents = match std::fs::read_to_string(self.path_of(file)) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {} cache", file.name()))
            }
        };
        let cached = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {} cache", file.name()))?;
        Ok(Some(cached))
    }

    /// Write to a temporary file, then rename it over the cache file
    fn write<T: Serialize>(&self, file: CacheFile, data: &T) -> Result<()> {
        let path = self.path_of(file);
        let tmp = path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(&CachedData::new(data))?;
        std::fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write {} cache", file.name()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {} cache", file.name()))?;
        Ok(())
    }

    /// Age of a cache file for display; unreadable files count as absent
    fn age_of<T: DeserializeOwned>(&self, file: CacheFile) -> Option<String> {
        match self.read::<T>(file) {
            Ok(cached) => cached.map(|c| c.age_display()),
            Err(e) => {
                debug!(cache = file.name(), error = %e, "Ignoring unreadable cache");
                None
            }
        }
    }

    pub fn load_products(&self) -> Result<Option<CachedData<Vec<Product>>>> {
        self.read(CacheFile::Products)
    }

    pub fn save_products(&self, products: &[Product]) -> Result<()> {
        self.write(CacheFile::Products, &products)
    }

    /// Load the saved cart, or an empty one if none was saved
    pub fn load_cart(&self) -> Result<Cart> {
        Ok(self
            .read::<Cart>(CacheFile::Cart)?
            .map(|cached| cached.data)
            .unwrap_or_default())
    }

    pub fn save_cart(&self, cart: &Cart) -> Result<()> {
        self.write(CacheFile::Cart, cart)
    }

    pub fn get_cache_ages(&self) -> CacheAges {
        CacheAges {
            products: self.age_of::<Vec<Product>>(CacheFile::Products),
            cart: self.age_of::<Cart>(CacheFile::Cart),
        }
    }
}

#[derive(Debug, Default)]
pub struct CacheAges {
    pub products: Option<String>,
    pub cart: Option<String>,
}

impl CacheAges {
    pub fn products_age(&self) -> String {
        self.products.clone().unwrap_or_else(|| "never".to_string())
    }

    pub fn cart_age(&self) -> String {
        self.cart.clone().unwrap_or_else(|| "never".to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
