//! Product review JSON API.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use marketstall_core::{ProductId, ReviewId};

use crate::error::{FieldErrors, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::routes::views::plain_text;
use crate::state::AppState;
use crate::woo::{NewReview, Review};

/// Longest review body accepted.
const MAX_REVIEW_CHARS: usize = 5000;

/// Body of `POST /api/products/{id}/reviews`.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: u8,
    #[serde(default)]
    pub review: String,
}

/// A review as returned to the browser, without the reviewer's email.
#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: ReviewId,
    pub reviewer: String,
    pub rating: u8,
    pub review: String,
    pub verified: bool,
    /// `approved`, or `hold` while awaiting moderation.
    pub status: String,
    pub date_created: Option<String>,
}

impl From<&Review> for ReviewResponse {
    fn from(review: &Review) -> Self {
        Self {
            id: review.id,
            reviewer: review.reviewer.clone(),
            rating: review.rating,
            review: plain_text(&review.review),
            verified: review.verified,
            status: review.status.clone(),
            date_created: review
                .date_created
                .map(|d| d.format("%Y-%m-%dT%H:%M:%S").to_string()),
        }
    }
}

fn validate(request: &ReviewRequest) -> Result<()> {
    let mut errors = FieldErrors::new();
    if !(1..=5).contains(&request.rating) {
        errors.add("rating", "Choose a rating from 1 to 5.");
    }
    if request.review.trim().is_empty() {
        errors.add("review", "Please write a few words about the product.");
    } else if request.review.chars().count() > MAX_REVIEW_CHARS {
        errors.add(
            "review",
            format!("Reviews are limited to {MAX_REVIEW_CHARS} characters."),
        );
    }
    errors.into_result()
}

/// Approved reviews for a product.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> Result<Json<Vec<ReviewResponse>>> {
    let reviews = state
        .commerce()
        .list_reviews(ProductId::new(product_id))
        .await?;
    Ok(Json(reviews.iter().map(ReviewResponse::from).collect()))
}

/// Submit a rating and review as the signed-in customer.
#[instrument(skip(state, customer, request), fields(customer_id = %customer.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(customer): RequireAuth,
    Path(product_id): Path<i64>,
    Json(request): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>)> {
    validate(&request)?;

    let product = state.commerce().get_product(ProductId::new(product_id)).await?;
    let review = state
        .commerce()
        .create_review(&NewReview {
            product_id: product.id,
            review: request.review.trim().to_string(),
            reviewer: customer.greeting_name().to_string(),
            reviewer_email: customer.email.clone(),
            rating: request.rating,
        })
        .await?;

    let product_id = product.id.to_string();
    add_breadcrumb("reviews", "Submitted review", Some(&[("product_id", &product_id)]));
    Ok((StatusCode::CREATED, Json(ReviewResponse::from(&review))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_validate_rating_range() {
        let request = ReviewRequest {
            rating: 0,
            review: "Lovely".to_string(),
        };
        let Err(AppError::Validation(fields)) = validate(&request) else {
            panic!("expected validation error");
        };
        assert!(fields.get("rating").is_some());
        assert!(fields.get("review").is_none());

        let request = ReviewRequest {
            rating: 5,
            review: "Lovely".to_string(),
        };
        assert!(validate(&request).is_ok());
    }

    #[test]
    fn test_validate_requires_text() {
        let request = ReviewRequest {
            rating: 4,
            review: "   ".to_string(),
        };
        assert!(validate(&request).is_err());
    }
}
