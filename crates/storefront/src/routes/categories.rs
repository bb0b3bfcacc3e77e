//! Category route handlers.

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use tracing::instrument;

use super::errors::{not_found_page, unavailable_page};
use super::products::{ListingQuery, render_listing};
use super::views::PageMeta;
use crate::middleware::OptionalAuth;
use crate::state::AppState;
use crate::woo::{CommerceError, ProductQuery, ProductSort};

/// Display a category's products.
///
/// Accepts the same `page` and `sort` parameters as the product listing.
#[instrument(skip(state, auth, query), fields(slug = %slug))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
    Path(slug): Path<String>,
    Query(query): Query<ListingQuery>,
) -> Response {
    let path = format!("/categories/{slug}");

    let category = match state.commerce().get_category_by_slug(&slug).await {
        Ok(category) => category,
        Err(e) => {
            let meta = PageMeta::new(state.config(), "Category not found", "", &path)
                .with_customer(auth.as_ref());
            if matches!(e, CommerceError::NotFound(_)) {
                return not_found_page(meta);
            }
            tracing::error!("Failed to fetch category: {e}");
            return unavailable_page(meta);
        }
    };

    let description = if category.description.is_empty() {
        format!("Shop {}.", category.name)
    } else {
        category.description.clone()
    };
    let meta = PageMeta::new(state.config(), category.name.clone(), &description, &path)
        .with_customer(auth.as_ref());

    let product_query = ProductQuery {
        page: query.page.unwrap_or(1).max(1),
        category: Some(category.id),
        sort: query
            .sort
            .as_deref()
            .map(ProductSort::from_param)
            .unwrap_or_default(),
        ..ProductQuery::default()
    };

    render_listing(&state, meta, category.name, path, Some(slug), product_query).await
}
