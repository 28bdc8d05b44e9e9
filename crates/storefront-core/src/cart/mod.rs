//! Client-side shopping cart.
//!
//! The cart lives entirely on the client and is persisted through the
//! `CacheManager`. Each product appears on at most one line and every
//! line has a quantity of at least one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Product;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CartError {
    #[error("Your cart is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    pub fn subtotal(&self) -> f64 {
        self.product.price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

/// What was bought by `Cart::checkout`
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSummary {
    pub items: Vec<CartItem>,
    pub total: f64,
}

impl Cart {
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(CartItem::subtotal).sum()
    }

    /// Add units of a product, merging into its existing line.
    /// The stored product is refreshed so the latest price wins.
    pub fn add_item(&mut self, product: Product, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.items.iter_mut().find(|item| item.product.id == product.id) {
            Some(item) => {
                item.quantity = item.quantity.saturating_add(quantity);
                item.product = product;
            }
            None => self.items.push(CartItem { product, quantity }),
        }
    }

    /// Returns false if the product was not in the cart
    pub fn remove_item(&mut self, product_id: i64) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product.id != product_id);
        self.items.len() != before
    }

    /// Set a line's quantity; zero removes the line.
    /// Returns false if the product was not in the cart.
    pub fn update_quantity(&mut self, product_id: i64, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove_item(product_id);
        }
        match self.items.iter_mut().find(|item| item.product.id == product_id) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Hand over the cart contents and empty it
    pub fn checkout(&mut self) -> Result<CheckoutSummary, CartError> {
        if self.is_empty() {
            return Err(CartError::Empty);
        }
        let total = self.total();
        let items = std::mem::take(&mut self.items);
        Ok(CheckoutSummary { items, total })
    }
}
