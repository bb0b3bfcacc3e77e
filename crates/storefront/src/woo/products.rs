//! Catalogue reads: products and categories.

use tracing::{debug, instrument};

use marketstall_core::{CategoryId, ProductId};

use super::cache::{CATEGORIES_KEY, CacheValue, product_key, product_slug_key};
use super::client::CommerceClient;
use super::types::{Category, Product, ProductPage, ProductQuery};
use super::CommerceError;

impl CommerceClient {
    // =========================================================================
    // Product Methods
    // =========================================================================

    /// List published products.
    ///
    /// Results without a free-text search are cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(page = query.page))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, CommerceError> {
        let cache_key = query.cache_key();
        let cacheable = query.is_cacheable();

        if cacheable
            && let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let (products, pagination) = self
            .get_paged::<Vec<Product>>("products", &query.to_pairs())
            .await?;

        let page = ProductPage {
            products,
            total: pagination.total,
            total_pages: pagination.total_pages,
            page: query.page.max(1),
        };

        if cacheable {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Products(page.clone()))
                .await;
        }

        Ok(page)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::NotFound`] if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, CommerceError> {
        let cache_key = product_key(id);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self.get(&format!("products/{id}"), &[]).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get a published product by its slug.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::NotFound`] if no product has this slug.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_product_by_slug(&self, slug: &str) -> Result<Product, CommerceError> {
        let cache_key = product_slug_key(slug);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product slug");
            return Ok(*product);
        }

        let query = ProductQuery {
            per_page: 1,
            slug: Some(slug.to_string()),
            ..ProductQuery::default()
        };
        let products: Vec<Product> = self.get("products", &query.to_pairs()).await?;

        let product = products
            .into_iter()
            .next()
            .ok_or_else(|| CommerceError::NotFound(format!("Product not found: {slug}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Fetch several products by id in one request.
    ///
    /// Unknown ids are silently absent from the result. Order follows `ids`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(count = ids.len()))]
    pub async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, CommerceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = ProductQuery {
            per_page: u32::try_from(ids.len())
                .unwrap_or(ProductQuery::MAX_PER_PAGE)
                .min(ProductQuery::MAX_PER_PAGE),
            include: ids.to_vec(),
            ..ProductQuery::default()
        };
        let mut products = self.list_products(&query).await?.products;
        products.sort_by_key(|p| ids.iter().position(|id| *id == p.id));
        Ok(products)
    }

    // =========================================================================
    // Category Methods
    // =========================================================================

    /// List all non-empty product categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, CommerceError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(CATEGORIES_KEY).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let query = [
            ("per_page", "100".to_string()),
            ("hide_empty", "true".to_string()),
            ("orderby", "name".to_string()),
        ];
        let categories: Vec<Category> = self.get("products/categories", &query).await?;

        self.inner
            .cache
            .insert(
                CATEGORIES_KEY.to_string(),
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }

    /// Find a category by slug.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::NotFound`] if no category has this slug.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_category_by_slug(&self, slug: &str) -> Result<Category, CommerceError> {
        self.list_categories()
            .await?
            .into_iter()
            .find(|c| c.slug == slug)
            .ok_or_else(|| CommerceError::NotFound(format!("Category not found: {slug}")))
    }

    /// Find a category by id among the cached category list.
    ///
    /// # Errors
    ///
    /// Returns an error if the category list cannot be loaded.
    pub async fn find_category(&self, id: CategoryId) -> Result<Option<Category>, CommerceError> {
        Ok(self
            .list_categories()
            .await?
            .into_iter()
            .find(|c| c.id == id))
    }
}
