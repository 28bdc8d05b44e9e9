use crate::models::Product;

/// Products shown per page
pub const PRODUCTS_PER_PAGE: usize = 8;

/// Pseudo-category that matches every product
pub const ALL_CATEGORIES: &str = "All";

/// Filters applied to the product list before paging.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// 1-based; `None` means the first page
    pub page: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: usize,
    pub total_pages: usize,
    pub total_matches: usize,
}

impl ProductQuery {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(ref term) = self.search {
            if !product.matches_search(term) {
                return false;
            }
        }
        if let Some(ref category) = self.category {
            if !category.is_empty() && category != ALL_CATEGORIES && product.category != *category {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        true
    }

    /// Filter then page. Pages past the end come back empty.
    pub fn apply(&self, products: &[Product]) -> ProductPage {
        let matching: Vec<&Product> = products.iter().filter(|p| self.matches(p)).collect();
        let total_matches = matching.len();
        let total_pages = total_matches.div_ceil(PRODUCTS_PER_PAGE).max(1);
        let page = self.page.unwrap_or(1).max(1);
        let offset = (page - 1).saturating_mul(PRODUCTS_PER_PAGE);

        let products = matching
            .into_iter()
            .skip(offset)
            .take(PRODUCTS_PER_PAGE)
            .cloned()
            .collect();

        ProductPage {
            products,
            page,
            total_pages,
            total_matches,
        }
    }
}

/// Distinct categories in the order they first appear
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for product in products {
        if !seen.iter().any(|c| *c == product.category) {
            seen.push(product.category.clone());
        }
    }
    seen
}

pub fn find_product(products: &[Product], id: i64) -> Option<&Product> {
    products.iter().find(|p| p.id == id)
}

/// Highest price rounded up, the default upper bound of the price filter
pub fn max_price(products: &[Product]) -> f64 {
    products
        .iter()
        .map(|p| p.price)
        .fold(0.0_f64, f64::max)
        .ceil()
}
