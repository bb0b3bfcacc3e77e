//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use super::views::{CategoryView, PageMeta, ProductCardView};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::state::AppState;
use crate::woo::ProductQuery;

/// Number of featured products on the home page.
const FEATURED_PRODUCTS: u32 = 8;

/// Number of categories linked from the home page.
const HOME_CATEGORIES: usize = 6;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub meta: PageMeta,
    /// Featured products, or the newest ones when nothing is featured.
    pub products: Vec<ProductCardView>,
    /// Top-level categories with products.
    pub categories: Vec<CategoryView>,
}

/// Display the home page.
///
/// Backend failures degrade to empty sections rather than an error page.
#[instrument(skip(state, auth))]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
) -> impl IntoResponse {
    let commerce = state.commerce();
    let currency = &state.config().currency;

    let featured = ProductQuery {
        per_page: FEATURED_PRODUCTS,
        featured: Some(true),
        ..ProductQuery::default()
    };
    let mut products = match commerce.list_products(&featured).await {
        Ok(page) => page.products,
        Err(e) => {
            tracing::error!("Failed to fetch featured products: {e}");
            Vec::new()
        }
    };
    if products.is_empty() {
        let newest = ProductQuery {
            per_page: FEATURED_PRODUCTS,
            ..ProductQuery::default()
        };
        products = commerce
            .list_products(&newest)
            .await
            .map(|page| page.products)
            .unwrap_or_else(|e| {
                tracing::error!("Failed to fetch newest products: {e}");
                Vec::new()
            });
    }

    let categories = commerce.list_categories().await.map_or_else(
        |e| {
            tracing::error!("Failed to fetch categories: {e}");
            Vec::new()
        },
        |categories| {
            categories
                .iter()
                .filter(|c| c.parent == 0 && c.count > 0)
                .take(HOME_CATEGORIES)
                .map(CategoryView::from)
                .collect()
        },
    );

    let meta = PageMeta::new(
        state.config(),
        "Marketstall",
        "Browse our latest products and categories.",
        "/",
    )
    .with_customer(auth.as_ref());

    HomeTemplate {
        meta,
        products: products
            .iter()
            .map(|p| ProductCardView::new(p, currency))
            .collect(),
        categories,
    }
}
