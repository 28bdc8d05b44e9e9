use anyhow::{anyhow, bail, Context, Result};

use storefront_core::cart::Cart;
use storefront_core::catalog;
use storefront_core::utils::{format_price, truncate_string};

use super::catalog::load_products;
use super::App;

fn load(app: &App) -> Result<Cart> {
    app.cache.load_cart().context("Failed to load cart")
}

fn save(app: &App, cart: &Cart) -> Result<()> {
    app.cache.save_cart(cart).context("Failed to save cart")
}

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }
    for item in cart.items() {
        println!(
            "{:>5}  {:<32}  {:>3} x {:>9}  {:>10}",
            item.product.id,
            truncate_string(&item.product.name, 32),
            item.quantity,
            item.product.display_price(),
            format_price(item.subtotal())
        );
    }
    println!("{} item(s), total {}", cart.item_count(), format_price(cart.total()));
}

pub fn show(app: &App) -> Result<()> {
    print_cart(&load(app)?);
    Ok(())
}

pub async fn add(app: &App, id: i64, quantity: u32) -> Result<()> {
    if quantity == 0 {
        bail!("Quantity must be at least 1");
    }
    let products = load_products(app, false).await?;
    let product = catalog::find_product(&products, id)
        .ok_or_else(|| anyhow!("Product {} not found", id))?
        .clone();

    let mut cart = load(app)?;
    println!("Added {} x {}", quantity, product.name);
    cart.add_item(product, quantity);
    save(app, &cart)?;
    print_cart(&cart);
    Ok(())
}

pub fn remove(app: &App, id: i64) -> Result<()> {
    let mut cart = load(app)?;
    if !cart.remove_item(id) {
        bail!("Product {} is not in your cart", id);
    }
    save(app, &cart)?;
    print_cart(&cart);
    Ok(())
}

pub fn set(app: &App, id: i64, quantity: u32) -> Result<()> {
    let mut cart = load(app)?;
    if !cart.update_quantity(id, quantity) {
        bail!("Product {} is not in your cart", id);
    }
    save(app, &cart)?;
    print_cart(&cart);
    Ok(())
}

pub fn clear(app: &App) -> Result<()> {
    let mut cart = load(app)?;
    cart.clear();
    save(app, &cart)?;
    println!("Cart cleared.");
    Ok(())
}

pub fn checkout(app: &App) -> Result<()> {
    let mut cart = load(app)?;
    let summary = cart.checkout()?;
    save(app, &cart)?;

    println!("Order placed:");
    for item in &summary.items {
        println!("  {} x {}", item.quantity, item.product.name);
    }
    println!("Total: {}", format_price(summary.total));
    Ok(())
}
