//! Wire types for the WooCommerce REST API.
//!
//! Read types are lenient (`#[serde(default)]` everywhere the backend may
//! omit a field); write types skip `None` fields so a patch only touches
//! what it names.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marketstall_core::{
    CategoryId, CouponLineId, CurrencyCode, CustomerId, LineItemId, OrderId, OrderStatus,
    ProductId, ReviewId, VariationId,
};

// =============================================================================
// Amounts
// =============================================================================

/// Lenient decimal parsing for backend amounts.
///
/// The backend mixes `"19.99"`, `19.99`, `""` and `null` for money fields.
pub(crate) mod amount {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Text(String),
        Int(i64),
        Float(f64),
    }

    fn parse<E: Error>(raw: RawAmount) -> Result<Option<Decimal>, E> {
        match raw {
            RawAmount::Text(s) if s.trim().is_empty() => Ok(None),
            RawAmount::Text(s) => Decimal::from_str(s.trim()).map(Some).map_err(E::custom),
            RawAmount::Int(i) => Ok(Some(Decimal::from(i))),
            RawAmount::Float(f) => Decimal::from_str(&f.to_string())
                .map(Some)
                .map_err(E::custom),
        }
    }

    /// Optional amount; empty strings and `null` become `None`.
    pub fn optional<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Decimal>, D::Error> {
        match Option::<RawAmount>::deserialize(d)? {
            Some(raw) => parse(raw),
            None => Ok(None),
        }
    }

    /// Required amount; empty strings and `null` become zero.
    pub fn or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
        optional(d).map(Option::unwrap_or_default)
    }
}

// =============================================================================
// Catalogue
// =============================================================================

/// Product or category image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub alt: String,
}

/// Category reference embedded in a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// A catalogue product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub permalink: String,
    /// Product type (`simple`, `variable`, ...).
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub featured: bool,
    /// Description as HTML.
    #[serde(default)]
    pub description: String,
    /// Short description as HTML.
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default, deserialize_with = "amount::optional")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "amount::optional")]
    pub regular_price: Option<Decimal>,
    #[serde(default, deserialize_with = "amount::optional")]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub on_sale: bool,
    #[serde(default = "default_true")]
    pub purchasable: bool,
    /// `instock`, `outofstock` or `onbackorder`.
    #[serde(default)]
    pub stock_status: String,
    #[serde(default, deserialize_with = "amount::optional")]
    pub average_rating: Option<Decimal>,
    #[serde(default)]
    pub rating_count: u32,
    #[serde(default)]
    pub related_ids: Vec<ProductId>,
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub variations: Vec<VariationId>,
    #[serde(default)]
    pub date_modified: Option<NaiveDateTime>,
}

const fn default_true() -> bool {
    true
}

impl Product {
    /// Whether the product can currently be added to a cart.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.purchasable && self.stock_status != "outofstock"
    }

    /// Whether a compare-at price should be shown next to the price.
    #[must_use]
    pub fn discounted_from(&self) -> Option<Decimal> {
        match (self.on_sale, self.regular_price, self.price) {
            (true, Some(regular), Some(price)) if regular > price => Some(regular),
            _ => None,
        }
    }
}

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    /// Parent category id, `0` for top-level categories.
    #[serde(default)]
    pub parent: i64,
    #[serde(default)]
    pub description: String,
    /// Number of published products in the category.
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub image: Option<Image>,
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    Newest,
    Popularity,
    Rating,
    PriceAsc,
    PriceDesc,
    Title,
}

impl ProductSort {
    /// Parse the storefront's `sort` query value. Unknown values fall back to newest.
    #[must_use]
    pub fn from_param(param: &str) -> Self {
        match param {
            "popularity" => Self::Popularity,
            "rating" => Self::Rating,
            "price-asc" => Self::PriceAsc,
            "price-desc" => Self::PriceDesc,
            "title" => Self::Title,
            _ => Self::Newest,
        }
    }

    /// The storefront's `sort` query value.
    #[must_use]
    pub const fn as_param(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Popularity => "popularity",
            Self::Rating => "rating",
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
            Self::Title => "title",
        }
    }

    /// Backend `orderby` and `order` parameters.
    const fn backend_params(self) -> (&'static str, &'static str) {
        match self {
            Self::Newest => ("date", "desc"),
            Self::Popularity => ("popularity", "desc"),
            Self::Rating => ("rating", "desc"),
            Self::PriceAsc => ("price", "asc"),
            Self::PriceDesc => ("price", "desc"),
            Self::Title => ("title", "asc"),
        }
    }
}

/// Filters for a product listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    /// 1-indexed page number.
    pub page: u32,
    pub per_page: u32,
    pub category: Option<CategoryId>,
    pub search: Option<String>,
    pub sort: ProductSort,
    pub featured: Option<bool>,
    pub include: Vec<ProductId>,
    pub slug: Option<String>,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 12,
            category: None,
            search: None,
            sort: ProductSort::default(),
            featured: None,
            include: Vec::new(),
            slug: None,
        }
    }
}

impl ProductQuery {
    /// Maximum page size accepted by the backend.
    pub const MAX_PER_PAGE: u32 = 100;

    /// Query string pairs for `GET /products`.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let (orderby, order) = self.sort.backend_params();
        let mut pairs = vec![
            ("page", self.page.max(1).to_string()),
            (
                "per_page",
                self.per_page.clamp(1, Self::MAX_PER_PAGE).to_string(),
            ),
            ("status", "publish".to_string()),
            ("orderby", orderby.to_string()),
            ("order", order.to_string()),
        ];
        if let Some(category) = self.category {
            pairs.push(("category", category.to_string()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim)
            && !search.is_empty()
        {
            pairs.push(("search", search.to_string()));
        }
        if let Some(featured) = self.featured {
            pairs.push(("featured", featured.to_string()));
        }
        if !self.include.is_empty() {
            let ids = self
                .include
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("include", ids));
        }
        if let Some(slug) = &self.slug {
            pairs.push(("slug", slug.clone()));
        }
        pairs
    }

    /// Whether the result is safe to cache (no free-text search).
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.search.as_deref().is_none_or(|s| s.trim().is_empty())
    }

    /// Cache key covering every parameter.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let pairs = self
            .to_pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("products:{pairs}")
    }
}

/// A page of products plus backend pagination totals.
#[derive(Debug, Clone, Default)]
pub struct ProductPage {
    pub products: Vec<Product>,
    /// Total matching products (`X-WP-Total`).
    pub total: u64,
    /// Total pages (`X-WP-TotalPages`).
    pub total_pages: u32,
    /// The page this result holds.
    pub page: u32,
}

impl ProductPage {
    /// Whether another page follows this one.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

// =============================================================================
// Reviews
// =============================================================================

/// A product review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reviewer: String,
    #[serde(default)]
    pub reviewer_email: String,
    /// Review body as HTML.
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub date_created: Option<NaiveDateTime>,
}

/// Payload for `POST /products/reviews`.
#[derive(Debug, Clone, Serialize)]
pub struct NewReview {
    pub product_id: ProductId,
    pub review: String,
    pub reviewer: String,
    pub reviewer_email: String,
    pub rating: u8,
}

// =============================================================================
// Customers
// =============================================================================

/// Billing or shipping address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub address_1: String,
    #[serde(default)]
    pub address_2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postcode: String,
    #[serde(default)]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A registered customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub billing: Address,
    #[serde(default)]
    pub shipping: Address,
}

/// Payload for `POST /customers`.
#[derive(Debug, Clone, Serialize)]
pub struct NewCustomer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub password: String,
}

// =============================================================================
// Orders
// =============================================================================

/// Line item image reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemImage {
    #[serde(default)]
    pub src: String,
}

/// A line item on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: LineItemId,
    #[serde(default)]
    pub name: String,
    pub product_id: ProductId,
    /// Variation id, `0` when the product is not variable.
    #[serde(default)]
    pub variation_id: i64,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default, deserialize_with = "amount::or_zero")]
    pub subtotal: Decimal,
    #[serde(default, deserialize_with = "amount::or_zero")]
    pub total: Decimal,
    /// Unit price as computed by the backend.
    #[serde(default, deserialize_with = "amount::optional")]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub image: Option<LineItemImage>,
}

impl OrderLineItem {
    /// The variation this line refers to, if any.
    #[must_use]
    pub fn variation(&self) -> Option<VariationId> {
        (self.variation_id > 0).then(|| VariationId::new(self.variation_id))
    }
}

/// A coupon applied to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponLine {
    pub id: CouponLineId,
    pub code: String,
    #[serde(default, deserialize_with = "amount::or_zero")]
    pub discount: Decimal,
}

/// An order, including orders acting as carts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub currency: CurrencyCode,
    /// Owning customer, `0` for guest orders.
    #[serde(default)]
    pub customer_id: i64,
    #[serde(default)]
    pub date_created: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "amount::or_zero")]
    pub discount_total: Decimal,
    #[serde(default, deserialize_with = "amount::or_zero")]
    pub shipping_total: Decimal,
    #[serde(default, deserialize_with = "amount::or_zero")]
    pub total_tax: Decimal,
    #[serde(default, deserialize_with = "amount::or_zero")]
    pub total: Decimal,
    #[serde(default)]
    pub line_items: Vec<OrderLineItem>,
    #[serde(default)]
    pub coupon_lines: Vec<CouponLine>,
    #[serde(default)]
    pub billing: Address,
    #[serde(default)]
    pub shipping: Address,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub payment_method_title: String,
    #[serde(default)]
    pub customer_note: String,
}

impl Order {
    /// The owning customer, if the order is not a guest order.
    #[must_use]
    pub fn customer(&self) -> Option<CustomerId> {
        (self.customer_id > 0).then(|| CustomerId::new(self.customer_id))
    }
}

/// A line item in a create or update payload.
///
/// A patch with only `id` preserves an existing line; `quantity: 0` on an
/// existing line removes it; a patch without `id` adds a new line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LineItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_id: Option<VariationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,
}

impl LineItemPatch {
    /// Keep an existing line untouched.
    #[must_use]
    pub fn keep(id: LineItemId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Remove an existing line.
    #[must_use]
    pub fn remove(id: LineItemId) -> Self {
        Self {
            id: Some(id),
            quantity: Some(0),
            ..Self::default()
        }
    }
}

/// A coupon line in an update payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponLinePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CouponLineId>,
    pub code: String,
}

/// Payload for `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
    pub line_items: Vec<LineItemPatch>,
    #[serde(default)]
    pub set_paid: bool,
}

/// Payload for `PUT /orders/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<LineItemPatch>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_lines: Option<Vec<CouponLinePatch>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_paid: Option<bool>,
}
