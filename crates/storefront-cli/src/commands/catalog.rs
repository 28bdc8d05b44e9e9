use anyhow::{anyhow, bail, Result};

use storefront_core::catalog::{self, ProductQuery, ProductSource, ALL_CATEGORIES};
use storefront_core::models::Product;
use storefront_core::utils::truncate_string;

use super::App;

/// Width of the name column in product listings
const NAME_WIDTH: usize = 32;

/// Load products, failing only when there is nothing to show at all
pub async fn load_products(app: &App, force_refresh: bool) -> Result<Vec<Product>> {
    let (products, source) = app.catalog().products(force_refresh).await;
    match source {
        ProductSource::Network | ProductSource::FreshCache => {}
        ProductSource::StaleCache => {
            eprintln!(
                "Could not reach the server, showing products cached {}",
                app.cache.get_cache_ages().products_age()
            );
        }
        ProductSource::Unavailable => {
            bail!("Could not load products and nothing is cached. Try again later.")
        }
    }
    Ok(products)
}

fn print_row(product: &Product) {
    println!(
        "{:>5}  {:<width$}  {:>10}  {}",
        product.id,
        truncate_string(&product.name, NAME_WIDTH),
        product.display_price(),
        product.category,
        width = NAME_WIDTH
    );
}

pub async fn products(app: &App, query: &ProductQuery, refresh: bool, json: bool) -> Result<()> {
    let products = load_products(app, refresh).await?;
    let page = query.apply(&products);

    if json {
        println!("{}", serde_json::to_string_pretty(&page.products)?);
        return Ok(());
    }

    if page.products.is_empty() {
        println!("No products found.");
    } else {
        for product in &page.products {
            print_row(product);
        }
    }
    println!(
        "Page {} of {} ({} matching)",
        page.page, page.total_pages, page.total_matches
    );
    Ok(())
}

pub async fn product(app: &App, id: i64) -> Result<()> {
    let products = load_products(app, false).await?;
    let product =
        catalog::find_product(&products, id).ok_or_else(|| anyhow!("Product {} not found", id))?;

    println!("{}", product.name);
    println!("  Price:    {}", product.display_price());
    println!("  Category: {}", product.category);
    if !product.image.is_empty() {
        println!("  Image:    {}", product.image);
    }
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }
    Ok(())
}

pub async fn categories(app: &App) -> Result<()> {
    let products = load_products(app, false).await?;
    println!("{}", ALL_CATEGORIES);
    for category in catalog::categories(&products) {
        println!("{}", category);
    }
    println!(
        "Prices up to {}",
        storefront_core::utils::format_price(catalog::max_price(&products))
    );
    Ok(())
}
