//! Wishlist lookup.
//!
//! The wishlist itself lives in the browser; this endpoint turns its product
//! ids into displayable summaries.

use std::collections::HashSet;

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use marketstall_core::ProductId;

use crate::error::Result;
use crate::routes::views::format_price;
use crate::state::AppState;
use crate::woo::{Product, ProductQuery};

/// Query of `GET /api/wishlist`.
#[derive(Debug, Default, Deserialize)]
pub struct WishlistQuery {
    /// Comma-separated product ids.
    #[serde(default)]
    pub ids: String,
}

/// A product as shown in the wishlist drawer.
#[derive(Debug, Serialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub url: String,
    pub price: String,
    pub image: Option<String>,
    pub in_stock: bool,
}

impl ProductSummary {
    fn new(product: &Product, state: &AppState) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            slug: product.slug.clone(),
            url: format!("/products/{}", product.slug),
            price: format_price(product.price, &state.config().currency),
            image: product.images.first().map(|i| i.src.clone()),
            in_stock: product.in_stock(),
        }
    }
}

/// Parse a comma-separated id list, skipping junk and duplicates.
fn parse_ids(raw: &str) -> Vec<ProductId> {
    let mut seen = HashSet::new();
    raw.split(',')
        .filter_map(|part| part.trim().parse::<ProductId>().ok())
        .filter(|id| seen.insert(*id))
        .take(ProductQuery::MAX_PER_PAGE as usize)
        .collect()
}

/// Product summaries for the given ids, in the order given.
#[instrument(skip(state, query))]
pub async fn show(
    State(state): State<AppState>,
    Query(query): Query<WishlistQuery>,
) -> Result<Json<Vec<ProductSummary>>> {
    let ids = parse_ids(&query.ids);
    let products = state.commerce().products_by_ids(&ids).await?;
    Ok(Json(
        products
            .iter()
            .map(|p| ProductSummary::new(p, &state))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ids_skips_junk_and_duplicates() {
        assert_eq!(
            parse_ids("3, 1,abc,,3,-2,7"),
            vec![ProductId::new(3), ProductId::new(1), ProductId::new(7)]
        );
        assert!(parse_ids("").is_empty());
    }
}
