//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use super::errors::{not_found_page, unavailable_page};
use super::views::{CategoryView, ImageView, PageMeta, ProductCardView, format_price, plain_text};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::state::AppState;
use crate::woo::{CommerceError, Product, ProductQuery, ProductSort, Review};

/// Related products shown under a product.
const RELATED_PRODUCTS: usize = 4;

/// Product detail data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: i64,
    pub slug: String,
    pub name: String,
    /// Backend HTML, rendered unescaped.
    pub description_html: String,
    pub short_description_html: String,
    pub sku: String,
    pub price: String,
    pub compare_at_price: Option<String>,
    pub images: Vec<ImageView>,
    pub in_stock: bool,
    pub variations: Vec<i64>,
    pub categories: Vec<CategoryView>,
    pub average_rating: Option<String>,
    pub rating_count: u32,
}

impl ProductView {
    fn new(product: &Product, currency: &marketstall_core::CurrencyCode) -> Self {
        Self {
            id: product.id.get(),
            slug: product.slug.clone(),
            name: product.name.clone(),
            description_html: product.description.clone(),
            short_description_html: product.short_description.clone(),
            sku: product.sku.clone(),
            price: format_price(product.price, currency),
            compare_at_price: product
                .discounted_from()
                .map(|p| format_price(Some(p), currency)),
            images: product.images.iter().map(ImageView::from).collect(),
            in_stock: product.in_stock(),
            variations: product.variations.iter().map(|v| v.get()).collect(),
            categories: product
                .categories
                .iter()
                .map(|c| CategoryView {
                    slug: c.slug.clone(),
                    name: c.name.clone(),
                    count: 0,
                    active: false,
                })
                .collect(),
            average_rating: product
                .average_rating
                .filter(|r| !r.is_zero())
                .map(|r| format!("{:.1}", r.round_dp(1))),
            rating_count: product.rating_count,
        }
    }
}

/// Review display data for templates.
#[derive(Clone)]
pub struct ReviewView {
    pub reviewer: String,
    pub rating: u8,
    pub body: String,
    pub date: String,
    pub verified: bool,
}

impl From<&Review> for ReviewView {
    fn from(review: &Review) -> Self {
        Self {
            reviewer: review.reviewer.clone(),
            rating: review.rating,
            body: plain_text(&review.review),
            date: review
                .date_created
                .map(|d| d.format("%B %-d, %Y").to_string())
                .unwrap_or_default(),
            verified: review.verified,
        }
    }
}

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub page: Option<u32>,
    /// Category slug.
    pub category: Option<String>,
    /// Free-text search.
    pub q: Option<String>,
    pub sort: Option<String>,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub meta: PageMeta,
    pub heading: String,
    /// Listing path the pagination and sort links point at.
    pub base_path: String,
    pub products: Vec<ProductCardView>,
    pub categories: Vec<CategoryView>,
    pub active_category: Option<String>,
    pub search: String,
    pub sort_options: Vec<SortOption>,
    pub current_page: u32,
    pub total_pages: u32,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

/// An entry in the sort menu.
#[derive(Clone)]
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Sort options offered on listing pages, as `(param, label)`.
const SORT_OPTIONS: &[(&str, &str)] = &[
    ("newest", "Newest"),
    ("popularity", "Most popular"),
    ("rating", "Top rated"),
    ("price-asc", "Price: low to high"),
    ("price-desc", "Price: high to low"),
    ("title", "Name"),
];

fn sort_options(current: ProductSort) -> Vec<SortOption> {
    SORT_OPTIONS
        .iter()
        .map(|&(value, label)| SortOption {
            value,
            label,
            selected: value == current.as_param(),
        })
        .collect()
}

/// Filters that carry over between pages of a listing.
struct ListingLinks<'a> {
    base_path: &'a str,
    /// Category slug, only carried on `/products`.
    category: Option<&'a str>,
    search: &'a str,
    sort: ProductSort,
}

impl ListingLinks<'_> {
    /// Link to `page` of the same listing.
    fn page_url(&self, page: u32) -> String {
        let mut params = vec![format!("page={page}")];
        if let Some(category) = self.category {
            params.push(format!("category={}", urlencoding::encode(category)));
        }
        if !self.search.is_empty() {
            params.push(format!("q={}", urlencoding::encode(self.search)));
        }
        if self.sort != ProductSort::default() {
            params.push(format!("sort={}", self.sort.as_param()));
        }
        format!("{}?{}", self.base_path, params.join("&"))
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub meta: PageMeta,
    pub product: ProductView,
    pub reviews: Vec<ReviewView>,
    pub related_products: Vec<ProductCardView>,
    pub signed_in: bool,
}

/// Render a listing for `query`, shared by the product and category pages.
pub(super) async fn render_listing(
    state: &AppState,
    meta: PageMeta,
    heading: String,
    base_path: String,
    active_category: Option<String>,
    query: ProductQuery,
) -> Response {
    let commerce = state.commerce();
    let currency = &state.config().currency;

    let page = match commerce.list_products(&query).await {
        Ok(page) => page,
        Err(e) => {
            tracing::error!("Failed to fetch products: {e}");
            return unavailable_page(meta);
        }
    };
    let categories: Vec<CategoryView> = commerce.list_categories().await.map_or_else(
        |e| {
            tracing::warn!("Failed to fetch categories: {e}");
            Vec::new()
        },
        |categories| categories.iter().map(CategoryView::from).collect(),
    );

    let search = query.search.unwrap_or_default();
    let links = ListingLinks {
        base_path: &base_path,
        category: active_category
            .as_deref()
            .filter(|_| base_path == "/products"),
        search: &search,
        sort: query.sort,
    };
    let prev_url = (page.page > 1).then(|| links.page_url(page.page - 1));
    let next_url = page.has_next().then(|| links.page_url(page.page + 1));

    let categories = categories
        .into_iter()
        .map(|mut c: CategoryView| {
            c.active = active_category.as_deref() == Some(c.slug.as_str());
            c
        })
        .collect();

    ProductsIndexTemplate {
        meta,
        heading,
        base_path,
        products: page
            .products
            .iter()
            .map(|p| ProductCardView::new(p, currency))
            .collect(),
        categories,
        active_category,
        search,
        sort_options: sort_options(query.sort),
        current_page: page.page,
        total_pages: page.total_pages.max(1),
        prev_url,
        next_url,
    }
    .into_response()
}

/// Display product listing page.
#[instrument(skip(state, auth))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
    Query(query): Query<ListingQuery>,
) -> Response {
    let search = query
        .q
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty());
    let mut heading = search
        .as_ref()
        .map_or_else(|| "All products".to_string(), |q| format!("Results for “{q}”"));
    let meta = PageMeta::new(
        state.config(),
        heading.clone(),
        "Browse the full catalogue.",
        "/products",
    )
    .with_customer(auth.as_ref());

    let mut category_id = None;
    let active_category = query.category.filter(|c| !c.is_empty());
    if let Some(slug) = &active_category {
        match state.commerce().get_category_by_slug(slug).await {
            Ok(category) => {
                category_id = Some(category.id);
                if search.is_none() {
                    heading.clone_from(&category.name);
                }
            }
            Err(CommerceError::NotFound(_)) => return not_found_page(meta),
            Err(e) => {
                tracing::error!("Failed to resolve category: {e}");
                return unavailable_page(meta);
            }
        }
    }

    let product_query = ProductQuery {
        page: query.page.unwrap_or(1).max(1),
        category: category_id,
        search,
        sort: query
            .sort
            .as_deref()
            .map(ProductSort::from_param)
            .unwrap_or_default(),
        ..ProductQuery::default()
    };

    render_listing(
        &state,
        meta,
        heading,
        "/products".to_string(),
        active_category,
        product_query,
    )
    .await
}

/// Display product detail page.
#[instrument(skip(state, auth), fields(slug = %slug))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
    Path(slug): Path<String>,
) -> Response {
    let commerce = state.commerce();
    let currency = &state.config().currency;
    let path = format!("/products/{slug}");

    let product = match commerce.get_product_by_slug(&slug).await {
        Ok(product) => product,
        Err(e) => {
            let meta = PageMeta::new(state.config(), "Product not found", "", &path)
                .with_customer(auth.as_ref());
            if matches!(e, CommerceError::NotFound(_)) {
                return not_found_page(meta);
            }
            tracing::error!("Failed to fetch product: {e}");
            return unavailable_page(meta);
        }
    };

    let reviews = commerce.list_reviews(product.id).await.map_or_else(
        |e| {
            tracing::warn!("Failed to fetch reviews: {e}");
            Vec::new()
        },
        |reviews| reviews.iter().map(ReviewView::from).collect(),
    );

    let related_ids: Vec<_> = product
        .related_ids
        .iter()
        .copied()
        .take(RELATED_PRODUCTS)
        .collect();
    let related_products = commerce.products_by_ids(&related_ids).await.map_or_else(
        |e| {
            tracing::warn!("Failed to fetch related products: {e}");
            Vec::new()
        },
        |products| {
            products
                .iter()
                .map(|p| ProductCardView::new(p, currency))
                .collect()
        },
    );

    let description = if product.short_description.is_empty() {
        &product.description
    } else {
        &product.short_description
    };
    let meta = PageMeta::new(state.config(), product.name.clone(), description, &path)
        .with_customer(auth.as_ref());

    ProductShowTemplate {
        meta,
        product: ProductView::new(&product, currency),
        reviews,
        related_products,
        signed_in: auth.is_some(),
    }
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_url_keeps_filters() {
        let links = ListingLinks {
            base_path: "/products",
            category: Some("tea"),
            search: "green tea",
            sort: ProductSort::PriceAsc,
        };
        assert_eq!(
            links.page_url(2),
            "/products?page=2&category=tea&q=green%20tea&sort=price-asc"
        );
    }

    #[test]
    fn test_page_url_omits_defaults() {
        let links = ListingLinks {
            base_path: "/categories/tea",
            category: None,
            search: "",
            sort: ProductSort::Newest,
        };
        assert_eq!(links.page_url(3), "/categories/tea?page=3");
    }

    #[test]
    fn test_sort_options_mark_current() {
        let options = sort_options(ProductSort::Rating);
        let selected: Vec<_> = options.iter().filter(|o| o.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected.first().map(|o| o.value), Some("rating"));
    }
}
