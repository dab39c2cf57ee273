//! Signup and token exchange

use axum::extract::State;
use folio_common::errors::Result;
use folio_common::services::{AccessToken, AccountService, SignupReceipt};
use serde::Deserialize;
use validator::Validate;

use super::extract::Json;
use super::validate_request;

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,

    #[validate(email, length(max = 254))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,

    #[validate(length(min = 1))]
    pub confirmation_code: String,
}

/// Register or re-send a confirmation code. Always answers with the pair
/// that was accepted, whether or not the mail went out.
pub async fn signup(
    State(accounts): State<AccountService>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<SignupReceipt>> {
    validate_request(&request)?;
    let receipt = accounts.signup(&request.username, &request.email).await?;
    Ok(Json(receipt))
}

pub async fn token(
    State(accounts): State<AccountService>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<AccessToken>> {
    validate_request(&request)?;
    let token = accounts
        .exchange_token(&request.username, &request.confirmation_code)
        .await?;
    Ok(Json(token))
}
