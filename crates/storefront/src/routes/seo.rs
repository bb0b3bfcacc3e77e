//! Crawler endpoints: `sitemap.xml` and `robots.txt`.

use std::fmt::Write as _;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::state::AppState;
use crate::woo::{ProductQuery, ProductSort};

/// Upper bound on product pages walked for the sitemap.
const SITEMAP_MAX_PAGES: u32 = 20;

/// Paths every sitemap lists.
const STATIC_PATHS: &[&str] = &["/", "/products"];

/// Escape text for an XML element.
fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Render `<url>` entries for `(location, lastmod)` pairs.
fn render_sitemap(entries: &[(String, Option<String>)]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for (loc, lastmod) in entries {
        let _ = write!(xml, "  <url><loc>{}</loc>", xml_escape(loc));
        if let Some(lastmod) = lastmod {
            let _ = write!(xml, "<lastmod>{lastmod}</lastmod>");
        }
        xml.push_str("</url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

/// Serve the sitemap: static pages, categories and every published product.
///
/// Backend failures truncate the sitemap instead of failing it.
#[instrument(skip(state))]
pub async fn sitemap(State(state): State<AppState>) -> Response {
    let config = state.config();
    let commerce = state.commerce();

    let mut entries: Vec<(String, Option<String>)> = STATIC_PATHS
        .iter()
        .map(|path| (config.absolute_url(path), None))
        .collect();

    match commerce.list_categories().await {
        Ok(categories) => entries.extend(categories.iter().map(|c| {
            (config.absolute_url(&format!("/categories/{}", c.slug)), None)
        })),
        Err(e) => tracing::warn!("Sitemap skipped categories: {e}"),
    }

    let mut page = 1;
    loop {
        let query = ProductQuery {
            page,
            per_page: ProductQuery::MAX_PER_PAGE,
            sort: ProductSort::Title,
            ..ProductQuery::default()
        };
        match commerce.list_products(&query).await {
            Ok(result) => {
                entries.extend(result.products.iter().map(|p| {
                    (
                        config.absolute_url(&format!("/products/{}", p.slug)),
                        p.date_modified.map(|d| d.format("%Y-%m-%d").to_string()),
                    )
                }));
                if !result.has_next() || page >= SITEMAP_MAX_PAGES {
                    break;
                }
                page += 1;
            }
            Err(e) => {
                tracing::warn!(page, "Sitemap stopped at product page: {e}");
                break;
            }
        }
    }

    (
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        render_sitemap(&entries),
    )
        .into_response()
}

/// Serve `robots.txt` pointing crawlers at the sitemap.
pub async fn robots(State(state): State<AppState>) -> Response {
    let body = format!(
        "User-agent: *\nDisallow: /api/\nDisallow: /account\nDisallow: /cart\nDisallow: /auth/\n\nSitemap: {}\n",
        state.config().absolute_url("/sitemap.xml")
    );
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}
