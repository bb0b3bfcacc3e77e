//! Product review endpoints.

use tracing::instrument;

use marketstall_core::ProductId;

use super::CommerceError;
use super::client::CommerceClient;
use super::types::{NewReview, Review};

/// Reviews shown on a product page.
const REVIEW_PAGE_SIZE: u32 = 20;

impl CommerceClient {
    /// Approved reviews for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product))]
    pub async fn list_reviews(&self, product: ProductId) -> Result<Vec<Review>, CommerceError> {
        let query = [
            ("product", product.to_string()),
            ("status", "approved".to_string()),
            ("per_page", REVIEW_PAGE_SIZE.to_string()),
        ];
        self.get("products/reviews", &query).await
    }

    /// Submit a review. The backend may hold it for moderation.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the review.
    #[instrument(skip(self, review), fields(product_id = %review.product_id, rating = review.rating))]
    pub async fn create_review(&self, review: &NewReview) -> Result<Review, CommerceError> {
        self.post("products/reviews", review).await
    }
}
