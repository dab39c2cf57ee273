//! Categories and genres
//!
//! Both are addressed by slug and share request shapes.

use axum::{extract::State, http::StatusCode};
use folio_common::{
    auth::AuthContext,
    errors::Result,
    services::{CatalogService, Taxon, TaxonInput, TaxonPatch},
};
use serde::Deserialize;
use validator::Validate;

use super::extract::{Json, Path, Query};
use super::{validate_request, SearchQuery};

#[derive(Debug, Deserialize, Validate)]
pub struct TaxonRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: String,

    #[validate(length(min = 1, max = 50))]
    pub slug: String,
}

impl From<TaxonRequest> for TaxonInput {
    fn from(request: TaxonRequest) -> Self {
        Self {
            name: request.name,
            slug: request.slug,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct TaxonPatchRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub slug: Option<String>,
}

impl From<TaxonPatchRequest> for TaxonPatch {
    fn from(request: TaxonPatchRequest) -> Self {
        Self {
            name: request.name,
            slug: request.slug,
        }
    }
}

// ============================================================================
// Categories
// ============================================================================

pub async fn list_categories(
    State(catalog): State<CatalogService>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Taxon>>> {
    Ok(Json(catalog.list_categories(query.search.as_deref()).await?))
}

pub async fn create_category(
    State(catalog): State<CatalogService>,
    auth: AuthContext,
    Json(request): Json<TaxonRequest>,
) -> Result<(StatusCode, Json<Taxon>)> {
    validate_request(&request)?;
    let category = catalog.create_category(auth.actor(), request.into()).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(catalog): State<CatalogService>,
    auth: AuthContext,
    Path(slug): Path<String>,
    Json(request): Json<TaxonPatchRequest>,
) -> Result<Json<Taxon>> {
    validate_request(&request)?;
    let category = catalog
        .update_category(auth.actor(), &slug, request.into())
        .await?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(catalog): State<CatalogService>,
    auth: AuthContext,
    Path(slug): Path<String>,
) -> Result<StatusCode> {
    catalog.delete_category(auth.actor(), &slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Genres
// ============================================================================

pub async fn list_genres(
    State(catalog): State<CatalogService>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Taxon>>> {
    Ok(Json(catalog.list_genres(query.search.as_deref()).await?))
}

pub async fn create_genre(
    State(catalog): State<CatalogService>,
    auth: AuthContext,
    Json(request): Json<TaxonRequest>,
) -> Result<(StatusCode, Json<Taxon>)> {
    validate_request(&request)?;
    let genre = catalog.create_genre(auth.actor(), request.into()).await?;
    Ok((StatusCode::CREATED, Json(genre)))
}

pub async fn update_genre(
    State(catalog): State<CatalogService>,
    auth: AuthContext,
    Path(slug): Path<String>,
    Json(request): Json<TaxonPatchRequest>,
) -> Result<Json<Taxon>> {
    validate_request(&request)?;
    let genre = catalog
        .update_genre(auth.actor(), &slug, request.into())
        .await?;
    Ok(Json(genre))
}

pub async fn delete_genre(
    State(catalog): State<CatalogService>,
    auth: AuthContext,
    Path(slug): Path<String>,
) -> Result<StatusCode> {
    catalog.delete_genre(auth.actor(), &slug).await?;
    Ok(StatusCode::NO_CONTENT)
}
