//! Review handlers, nested under a title

use axum::{extract::State, http::StatusCode};
use folio_common::{
    auth::AuthContext,
    errors::Result,
    services::{ReviewDetails, ReviewInput, ReviewPatch, ReviewService},
};
use serde::Deserialize;
use validator::Validate;

use super::extract::{Json, Path};
use super::validate_request;

/// Any `author`, `title` or `pub_date` in the body is ignored
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(length(min = 1, max = 500))]
    pub text: String,

    #[validate(range(min = 1, max = 10))]
    pub score: i32,
}

impl From<CreateReviewRequest> for ReviewInput {
    fn from(request: CreateReviewRequest) -> Self {
        Self {
            text: request.text,
            score: request.score,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(length(min = 1, max = 500))]
    pub text: Option<String>,

    #[validate(range(min = 1, max = 10))]
    pub score: Option<i32>,
}

impl From<UpdateReviewRequest> for ReviewPatch {
    fn from(request: UpdateReviewRequest) -> Self {
        Self {
            text: request.text,
            score: request.score,
        }
    }
}

/// Newest first
pub async fn list_reviews(
    State(reviews): State<ReviewService>,
    Path(title_id): Path<i32>,
) -> Result<Json<Vec<ReviewDetails>>> {
    Ok(Json(reviews.list_reviews(title_id).await?))
}

pub async fn create_review(
    State(reviews): State<ReviewService>,
    auth: AuthContext,
    Path(title_id): Path<i32>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewDetails>)> {
    auth.require_user()?;
    validate_request(&request)?;
    let review = reviews
        .create_review(auth.actor(), title_id, request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn get_review(
    State(reviews): State<ReviewService>,
    Path((title_id, review_id)): Path<(i32, i32)>,
) -> Result<Json<ReviewDetails>> {
    Ok(Json(reviews.get_review(title_id, review_id).await?))
}

pub async fn update_review(
    State(reviews): State<ReviewService>,
    auth: AuthContext,
    Path((title_id, review_id)): Path<(i32, i32)>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<ReviewDetails>> {
    auth.require_user()?;
    validate_request(&request)?;
    let review = reviews
        .update_review(auth.actor(), title_id, review_id, request.into())
        .await?;
    Ok(Json(review))
}

pub async fn delete_review(
    State(reviews): State<ReviewService>,
    auth: AuthContext,
    Path((title_id, review_id)): Path<(i32, i32)>,
) -> Result<StatusCode> {
    reviews
        .delete_review(auth.actor(), title_id, review_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
