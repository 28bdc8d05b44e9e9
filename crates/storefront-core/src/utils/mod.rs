//! Utility functions for formatting and input normalization.

pub mod format;

pub use format::{format_date, format_optional, format_price, normalize_birth_date, truncate_string};
