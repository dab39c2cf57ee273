//! User records: self profile and admin management

use axum::{extract::State, http::StatusCode};
use folio_common::{
    auth::AuthContext,
    db::models::Role,
    errors::Result,
    services::{AccountService, CreateUser, UserPatch, UserProfile},
};
use serde::Deserialize;
use validator::Validate;

use super::extract::{Json, Path, Query};
use super::{validate_request, SearchQuery};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,

    #[validate(email, length(max = 254))]
    pub email: String,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,

    #[serde(default)]
    pub bio: String,

    #[serde(default)]
    pub role: Role,
}

impl From<CreateUserRequest> for CreateUser {
    fn from(request: CreateUserRequest) -> Self {
        Self {
            username: request.username,
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
            bio: request.bio,
            role: request.role,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct PatchUserRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: Option<String>,

    #[validate(email, length(max = 254))]
    pub email: Option<String>,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,

    pub bio: Option<String>,

    pub role: Option<Role>,
}

impl From<PatchUserRequest> for UserPatch {
    fn from(request: PatchUserRequest) -> Self {
        Self {
            username: request.username,
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
            bio: request.bio,
            role: request.role,
        }
    }
}

pub async fn list_users(
    State(accounts): State<AccountService>,
    auth: AuthContext,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<UserProfile>>> {
    let users = accounts
        .list_users(auth.actor(), query.search.as_deref())
        .await?;
    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}

pub async fn create_user(
    State(accounts): State<AccountService>,
    auth: AuthContext,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    validate_request(&request)?;
    let user = accounts.create_user(auth.actor(), request.into()).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn get_me(auth: AuthContext) -> Result<Json<UserProfile>> {
    let user = auth.require_user()?;
    Ok(Json(user.clone().into()))
}

/// A role in the body is ignored unless the caller is an administrator
pub async fn patch_me(
    State(accounts): State<AccountService>,
    auth: AuthContext,
    Json(request): Json<PatchUserRequest>,
) -> Result<Json<UserProfile>> {
    let actor = auth.require_user()?;
    validate_request(&request)?;
    let user = accounts.patch_self(actor, request.into()).await?;
    Ok(Json(user.into()))
}

pub async fn get_user(
    State(accounts): State<AccountService>,
    auth: AuthContext,
    Path(username): Path<String>,
) -> Result<Json<UserProfile>> {
    let user = accounts.get_user(auth.actor(), &username).await?;
    Ok(Json(user.into()))
}

pub async fn patch_user(
    State(accounts): State<AccountService>,
    auth: AuthContext,
    Path(username): Path<String>,
    Json(request): Json<PatchUserRequest>,
) -> Result<Json<UserProfile>> {
    validate_request(&request)?;
    let user = accounts
        .patch_user(auth.actor(), &username, request.into())
        .await?;
    Ok(Json(user.into()))
}

pub async fn delete_user(
    State(accounts): State<AccountService>,
    auth: AuthContext,
    Path(username): Path<String>,
) -> Result<StatusCode> {
    accounts.delete_user(auth.actor(), &username).await?;
    Ok(StatusCode::NO_CONTENT)
}
