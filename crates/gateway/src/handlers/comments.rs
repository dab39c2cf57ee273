//! Comment handlers, nested under a title's review

use axum::{extract::State, http::StatusCode};
use folio_common::{
    auth::AuthContext,
    errors::Result,
    services::{CommentDetails, CommentInput, ReviewService},
};
use serde::Deserialize;
use validator::Validate;

use super::extract::{Json, Path};
use super::validate_request;

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 200))]
    pub text: String,
}

impl From<CommentRequest> for CommentInput {
    fn from(request: CommentRequest) -> Self {
        Self { text: request.text }
    }
}

pub async fn list_comments(
    State(reviews): State<ReviewService>,
    Path((title_id, review_id)): Path<(i32, i32)>,
) -> Result<Json<Vec<CommentDetails>>> {
    Ok(Json(reviews.list_comments(title_id, review_id).await?))
}

pub async fn create_comment(
    State(reviews): State<ReviewService>,
    auth: AuthContext,
    Path((title_id, review_id)): Path<(i32, i32)>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<CommentDetails>)> {
    auth.require_user()?;
    validate_request(&request)?;
    let comment = reviews
        .create_comment(auth.actor(), title_id, review_id, request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment(
    State(reviews): State<ReviewService>,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
) -> Result<Json<CommentDetails>> {
    Ok(Json(
        reviews.get_comment(title_id, review_id, comment_id).await?,
    ))
}

pub async fn update_comment(
    State(reviews): State<ReviewService>,
    auth: AuthContext,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
    Json(request): Json<CommentRequest>,
) -> Result<Json<CommentDetails>> {
    auth.require_user()?;
    validate_request(&request)?;
    let comment = reviews
        .update_comment(auth.actor(), title_id, review_id, comment_id, request.into())
        .await?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(reviews): State<ReviewService>,
    auth: AuthContext,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
) -> Result<StatusCode> {
    reviews
        .delete_comment(auth.actor(), title_id, review_id, comment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
