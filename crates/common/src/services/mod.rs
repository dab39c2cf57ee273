//! Domain operations
//!
//! Every operation takes the acting user (if any), asks the permission
//! evaluator, validates its input and only then touches storage.

mod accounts;
mod catalog;
mod reviews;

pub use accounts::{
    AccessToken, AccountService, AccountSettings, CreateUser, SignupReceipt, UserPatch,
    UserProfile,
};
pub use catalog::{
    CatalogService, CreateTitle, Taxon, TaxonInput, TaxonPatch, TitleDetails, TitlePatch,
};
pub use reviews::{
    CommentDetails, CommentInput, ReviewDetails, ReviewInput, ReviewPatch, ReviewService,
};

use crate::auth::JwtManager;
use crate::clock::Clock;
use crate::db::Repository;
use crate::mail::Mailer;
use std::sync::Arc;

/// All services over one repository and one set of collaborators
#[derive(Clone)]
pub struct Services {
    pub accounts: AccountService,
    pub catalog: CatalogService,
    pub reviews: ReviewService,
}

impl Services {
    pub fn new(
        repo: Repository,
        jwt: Arc<JwtManager>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        settings: AccountSettings,
    ) -> Self {
        Self {
            accounts: AccountService::new(repo.clone(), jwt, mailer, clock.clone(), settings),
            catalog: CatalogService::new(repo.clone(), clock.clone()),
            reviews: ReviewService::new(repo, clock),
        }
    }
}
