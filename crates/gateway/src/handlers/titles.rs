//! Title handlers

use axum::{extract::State, http::StatusCode};
use folio_common::{
    auth::AuthContext,
    db::TitleFilter,
    errors::Result,
    services::{CatalogService, CreateTitle, TitleDetails, TitlePatch},
};
use serde::Deserialize;
use validator::Validate;

use super::extract::{Json, Path, Query};
use super::{nullable, validate_request};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTitleRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: String,

    pub year: i32,

    pub description: Option<String>,

    /// Category slug
    pub category: Option<String>,

    /// Genre slugs
    #[serde(default)]
    pub genre: Vec<String>,
}

impl From<CreateTitleRequest> for CreateTitle {
    fn from(request: CreateTitleRequest) -> Self {
        Self {
            name: request.name,
            year: request.year,
            description: request.description,
            category: request.category,
            genre: request.genre,
        }
    }
}

/// `"category": null` detaches the title from its category; leaving the
/// field out keeps it
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTitleRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: Option<String>,
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub category: Option<Option<String>>,
    pub genre: Option<Vec<String>>,
}

impl From<UpdateTitleRequest> for TitlePatch {
    fn from(request: UpdateTitleRequest) -> Self {
        Self {
            name: request.name,
            year: request.year,
            description: request.description,
            category: request.category,
            genre: request.genre,
        }
    }
}

/// List titles; `category`, `genre`, `name` and `year` narrow the result
pub async fn list_titles(
    State(catalog): State<CatalogService>,
    Query(filter): Query<TitleFilter>,
) -> Result<Json<Vec<TitleDetails>>> {
    Ok(Json(catalog.list_titles(&filter).await?))
}

pub async fn create_title(
    State(catalog): State<CatalogService>,
    auth: AuthContext,
    Json(request): Json<CreateTitleRequest>,
) -> Result<(StatusCode, Json<TitleDetails>)> {
    validate_request(&request)?;
    let title = catalog.create_title(auth.actor(), request.into()).await?;
    Ok((StatusCode::CREATED, Json(title)))
}

/// The rating is computed on every read
pub async fn get_title(
    State(catalog): State<CatalogService>,
    Path(title_id): Path<i32>,
) -> Result<Json<TitleDetails>> {
    Ok(Json(catalog.get_title(title_id).await?))
}

pub async fn update_title(
    State(catalog): State<CatalogService>,
    auth: AuthContext,
    Path(title_id): Path<i32>,
    Json(request): Json<UpdateTitleRequest>,
) -> Result<Json<TitleDetails>> {
    validate_request(&request)?;
    let title = catalog
        .update_title(auth.actor(), title_id, request.into())
        .await?;
    Ok(Json(title))
}

pub async fn delete_title(
    State(catalog): State<CatalogService>,
    auth: AuthContext,
    Path(title_id): Path<i32>,
) -> Result<StatusCode> {
    catalog.delete_title(auth.actor(), title_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
