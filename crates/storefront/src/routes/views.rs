//! View models shared by page templates.

use rust_decimal::Decimal;

use marketstall_core::{CurrencyCode, Price};

use crate::config::StorefrontConfig;
use crate::models::CurrentCustomer;
use crate::woo::{Category, Image, Product};

/// Maximum length of a meta description.
const DESCRIPTION_MAX_CHARS: usize = 160;

/// SEO and header data every page carries.
#[derive(Clone)]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub canonical_url: String,
    /// Greeting name of the signed-in customer.
    pub customer_name: Option<String>,
}

impl PageMeta {
    /// Metadata for the page at `path`.
    pub fn new(
        config: &StorefrontConfig,
        title: impl Into<String>,
        description: &str,
        path: &str,
    ) -> Self {
        Self {
            title: title.into(),
            description: truncate(&plain_text(description), DESCRIPTION_MAX_CHARS),
            canonical_url: config.absolute_url(path),
            customer_name: None,
        }
    }

    /// Attach the signed-in customer, if any.
    #[must_use]
    pub fn with_customer(mut self, customer: Option<&CurrentCustomer>) -> Self {
        self.customer_name = customer.map(|c| c.greeting_name().to_string());
        self
    }
}

/// Image display data for templates.
#[derive(Clone)]
pub struct ImageView {
    pub url: String,
    pub alt: String,
}

impl From<&Image> for ImageView {
    fn from(image: &Image) -> Self {
        Self {
            url: image.src.clone(),
            alt: image.alt.clone(),
        }
    }
}

/// Product tile for grids.
#[derive(Clone)]
pub struct ProductCardView {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub price: String,
    pub compare_at_price: Option<String>,
    pub image: Option<ImageView>,
    pub in_stock: bool,
}

impl ProductCardView {
    pub fn new(product: &Product, currency: &CurrencyCode) -> Self {
        Self {
            id: product.id.get(),
            slug: product.slug.clone(),
            name: product.name.clone(),
            price: format_price(product.price, currency),
            compare_at_price: product
                .discounted_from()
                .map(|p| format_price(Some(p), currency)),
            image: product.images.first().map(|img| {
                let mut view = ImageView::from(img);
                if view.alt.is_empty() {
                    view.alt.clone_from(&product.name);
                }
                view
            }),
            in_stock: product.in_stock(),
        }
    }
}

/// Category link data for templates.
#[derive(Clone)]
pub struct CategoryView {
    pub slug: String,
    pub name: String,
    pub count: u32,
    /// Whether the current listing is filtered to this category.
    pub active: bool,
}

impl From<&Category> for CategoryView {
    fn from(category: &Category) -> Self {
        Self {
            slug: category.slug.clone(),
            name: category.name.clone(),
            count: category.count,
            active: false,
        }
    }
}

/// Format an optional catalogue price; products without one show as empty.
pub fn format_price(amount: Option<Decimal>, currency: &CurrencyCode) -> String {
    amount.map_or_else(String::new, |a| Price::new(a, currency.clone()).display())
}

/// Strip tags and collapse whitespace in backend HTML.
pub fn plain_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars - 1).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_strips_tags() {
        assert_eq!(
            plain_text("<p>Loose-leaf <strong>green</strong>\n tea.</p>"),
            "Loose-leaf green tea."
        );
        assert_eq!(plain_text("<br/>"), "");
    }

    #[test]
    fn test_truncate_long_text() {
        let long = "word ".repeat(60);
        let cut = truncate(long.trim(), DESCRIPTION_MAX_CHARS);
        assert!(cut.chars().count() <= DESCRIPTION_MAX_CHARS);
        assert!(cut.ends_with('…'));
        assert_eq!(truncate("short", DESCRIPTION_MAX_CHARS), "short");
    }

    #[test]
    fn test_format_price_without_amount() {
        assert_eq!(format_price(None, &CurrencyCode::USD), "");
        assert_eq!(
            format_price(Some(Decimal::new(1250, 2)), &CurrencyCode::USD),
            "$12.50"
        );
    }
}
