//! Cache values for catalogue responses.

use super::types::{Category, Product, ProductPage};

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(ProductPage),
    Categories(Vec<Category>),
}

/// Cache key for a single product by id.
pub fn product_key(id: marketstall_core::ProductId) -> String {
    format!("product:{id}")
}

/// Cache key for a single product by slug.
pub fn product_slug_key(slug: &str) -> String {
    format!("product-slug:{slug}")
}

/// Cache key for the full category list.
pub const CATEGORIES_KEY: &str = "categories";
