use serde::{Deserialize, Serialize};

use crate::utils::format_price;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub image: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
}

impl Product {
    pub fn display_price(&self) -> String {
        format_price(self.price)
    }

    /// Case-insensitive match against name and description
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&term) || self.description.to_lowercase().contains(&term)
    }
}
