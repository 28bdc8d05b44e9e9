//! Product catalog: fetching, caching and filtering.
//!
//! Products are public; they are fetched without requiring a session and
//! cached locally so browsing keeps working when the backend is down.

pub mod products;
pub mod query;

pub use products::{Catalog, ProductSource};
pub use query::{
    categories, find_product, max_price, ProductPage, ProductQuery, ALL_CATEGORIES,
    PRODUCTS_PER_PAGE,
};
