//! Signup, token exchange and user records

use crate::auth::{
    generate_confirmation_code, hash_confirmation_code, verify_confirmation_code, JwtManager,
};
use crate::clock::Clock;
use crate::db::models::{Role, User, UserActiveModel};
use crate::db::{NewUser, Repository};
use crate::errors::{AppError, Result};
use crate::mail::Mailer;
use crate::metrics;
use crate::permissions::{authorize, Action, Resource};
use crate::validation;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Knobs for signup mail and code generation
#[derive(Debug, Clone)]
pub struct AccountSettings {
    pub code_bytes: usize,
    pub confirmation_subject: String,
    /// Upper bound on confirmation mail delivery, retries included. Must stay
    /// below the request timeout so signup can still answer.
    pub mail_deadline: Duration,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            code_bytes: 16,
            confirmation_subject: "Confirmation code".to_string(),
            mail_deadline: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignupReceipt {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub token: String,
}

/// Public shape of a user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: String,
    pub role: Role,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            role: user.role,
        }
    }
}

/// Partial update of a user record; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
}

/// Admin-created user
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Clone)]
pub struct AccountService {
    repo: Repository,
    jwt: Arc<JwtManager>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    settings: AccountSettings,
}

impl AccountService {
    pub fn new(
        repo: Repository,
        jwt: Arc<JwtManager>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        settings: AccountSettings,
    ) -> Self {
        Self {
            repo,
            jwt,
            mailer,
            clock,
            settings,
        }
    }

    /// Register a (username, email) pair, or re-send a code to an existing
    /// matching pair.
    ///
    /// A fresh code replaces the stored digest on every call. Delivery
    /// failures are logged and counted; the user row and the new code
    /// persist either way, so a repeat signup can resend.
    pub async fn signup(&self, username: &str, email: &str) -> Result<SignupReceipt> {
        validation::validate_username(username)?;
        validation::validate_email(email)?;

        let code = generate_confirmation_code(self.settings.code_bytes);
        let (user, created) = self
            .repo
            .register_signup(username, email, hash_confirmation_code(&code), self.clock.now())
            .await?;

        metrics::record_signup(created);
        info!(user_id = user.id, created, "Signup accepted");

        let body = format!("Your confirmation code: {code}");
        let delivery = self
            .mailer
            .send(&user.email, &self.settings.confirmation_subject, &body);
        let outcome = match tokio::time::timeout(self.settings.mail_deadline, delivery).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Mail {
                message: format!(
                    "delivery did not finish within {:?}",
                    self.settings.mail_deadline
                ),
            }),
        };
        if let Err(e) = outcome {
            metrics::record_mail_failure();
            warn!(user_id = user.id, error = %e, "Confirmation code was not delivered");
        }

        Ok(SignupReceipt {
            username: user.username,
            email: user.email,
        })
    }

    /// Trade a confirmation code for an access token. The code stays valid
    /// until the next signup for the same user replaces it.
    pub async fn exchange_token(&self, username: &str, code: &str) -> Result<AccessToken> {
        if username.is_empty() {
            return Err(AppError::validation("username", "may not be blank"));
        }
        if code.is_empty() {
            return Err(AppError::validation("confirmation_code", "may not be blank"));
        }

        let user = self
            .repo
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("user", username))?;

        let matches = user
            .confirmation_code_hash
            .as_deref()
            .is_some_and(|hash| verify_confirmation_code(code, hash));
        if !matches {
            return Err(AppError::InvalidCredential);
        }

        let token = self.jwt.generate_token(&user)?;
        metrics::record_token_issued();
        info!(user_id = user.id, "Access token issued");

        Ok(AccessToken { token })
    }

    /// Resolve a bearer token to the user it was minted for
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let claims = self.jwt.validate_token(token)?;
        self.repo
            .find_user_by_id(claims.user_id()?)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    /// Patch the actor's own record. The role field is honored only for
    /// actors allowed to change roles and silently dropped otherwise.
    pub async fn patch_self(&self, actor: &User, mut patch: UserPatch) -> Result<User> {
        authorize(Some(actor), Action::Update, Resource::User { id: actor.id })?;

        if patch.role.is_some()
            && authorize(Some(actor), Action::Update, Resource::UserRole { id: actor.id }).is_err()
        {
            patch.role = None;
        }

        self.apply_patch(actor.clone(), patch).await
    }

    pub async fn list_users(&self, actor: Option<&User>, search: Option<&str>) -> Result<Vec<User>> {
        authorize(actor, Action::Read, Resource::Users)?;
        self.repo.list_users(search).await
    }

    pub async fn create_user(&self, actor: Option<&User>, input: CreateUser) -> Result<User> {
        authorize(actor, Action::Create, Resource::Users)?;
        validation::validate_username(&input.username)?;
        validation::validate_email(&input.email)?;

        let user = self
            .repo
            .create_user(
                NewUser {
                    username: input.username,
                    email: input.email,
                    first_name: input.first_name,
                    last_name: input.last_name,
                    bio: input.bio,
                    role: input.role,
                },
                self.clock.now(),
            )
            .await?;

        metrics::record_mutation("user", "create");
        info!(user_id = user.id, role = ?user.role, "User created");
        Ok(user)
    }

    pub async fn get_user(&self, actor: Option<&User>, username: &str) -> Result<User> {
        authorize(actor, Action::Read, Resource::Users)?;
        self.find_by_username(username).await
    }

    pub async fn patch_user(
        &self,
        actor: Option<&User>,
        username: &str,
        patch: UserPatch,
    ) -> Result<User> {
        authorize(actor, Action::Update, Resource::Users)?;
        let user = self.find_by_username(username).await?;
        if patch.role.is_some() {
            authorize(actor, Action::Update, Resource::UserRole { id: user.id })?;
        }
        self.apply_patch(user, patch).await
    }

    pub async fn delete_user(&self, actor: Option<&User>, username: &str) -> Result<()> {
        authorize(actor, Action::Delete, Resource::Users)?;
        let user = self.find_by_username(username).await?;

        self.repo.delete_user(user.id).await?;
        metrics::record_mutation("user", "delete");
        info!(user_id = user.id, "User deleted");
        Ok(())
    }

    /// Start-up bootstrap of the configured superuser
    pub async fn ensure_superuser(&self, username: &str, email: &str) -> Result<User> {
        validation::validate_username(username)?;
        validation::validate_email(email)?;

        let user = self
            .repo
            .ensure_superuser(username, email, self.clock.now())
            .await?;
        info!(user_id = user.id, username = %user.username, "Superuser ready");
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<User> {
        self.repo
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("user", username))
    }

    async fn apply_patch(&self, user: User, patch: UserPatch) -> Result<User> {
        let user_id = user.id;
        let mut active: UserActiveModel = user.into();

        if let Some(username) = patch.username {
            validation::validate_username(&username)?;
            active.username = Set(username);
        }
        if let Some(email) = patch.email {
            validation::validate_email(&email)?;
            active.email = Set(email);
        }
        if let Some(first_name) = patch.first_name {
            active.first_name = Set(Some(first_name));
        }
        if let Some(last_name) = patch.last_name {
            active.last_name = Set(Some(last_name));
        }
        if let Some(bio) = patch.bio {
            active.bio = Set(bio);
        }
        if let Some(role) = patch.role {
            active.role = Set(role);
        }

        let user = self.repo.update_user(active).await?;
        metrics::record_mutation("user", "update");
        info!(user_id, "User updated");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::Harness;
    use tokio_test::assert_ok;

    fn code_from(body: &str) -> String {
        body.rsplit(' ').next().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn test_repeat_signup_keeps_one_user() {
        let h = Harness::new().await;

        let first = assert_ok!(h.services.accounts.signup("reader", "reader@example.com").await);
        let second = assert_ok!(h.services.accounts.signup("reader", "reader@example.com").await);

        assert_eq!(first, second);
        assert_eq!(h.repo.list_users(None).await.unwrap().len(), 1);
        assert_eq!(h.mailer.sent().await.len(), 2);
    }

    #[tokio::test]
    async fn test_signup_identity_mismatch() {
        let h = Harness::new().await;
        assert_ok!(h.services.accounts.signup("reader", "reader@example.com").await);
        assert_ok!(h.services.accounts.signup("other", "other@example.com").await);

        let err = h
            .services
            .accounts
            .signup("reader", "new@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CredentialsMismatch));

        let err = h
            .services
            .accounts
            .signup("newname", "reader@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CredentialsMismatch));

        // Swapping two existing identities is also a mismatch
        let err = h
            .services
            .accounts
            .signup("reader", "other@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CredentialsMismatch));
    }

    #[tokio::test]
    async fn test_signup_rejects_bad_username() {
        let h = Harness::new().await;
        let err = h
            .services
            .accounts
            .signup("me", "me@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert!(h.mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_code_exchange_is_repeatable() {
        let h = Harness::new().await;
        assert_ok!(h.services.accounts.signup("reader", "reader@example.com").await);
        let mail = h.mailer.last_to("reader@example.com").await.unwrap();
        let code = code_from(&mail.body);

        let err = h
            .services
            .accounts
            .exchange_token("reader", "not-the-code")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredential));

        let first = assert_ok!(h.services.accounts.exchange_token("reader", &code).await);
        let second = assert_ok!(h.services.accounts.exchange_token("reader", &code).await);

        let user = assert_ok!(h.services.accounts.authenticate(&first.token).await);
        assert_eq!(user.username, "reader");
        assert_ok!(h.services.accounts.authenticate(&second.token).await);
    }

    #[tokio::test]
    async fn test_resignup_replaces_code() {
        let h = Harness::new().await;
        assert_ok!(h.services.accounts.signup("reader", "reader@example.com").await);
        let old = code_from(&h.mailer.last_to("reader@example.com").await.unwrap().body);

        assert_ok!(h.services.accounts.signup("reader", "reader@example.com").await);
        let new = code_from(&h.mailer.last_to("reader@example.com").await.unwrap().body);

        assert!(matches!(
            h.services.accounts.exchange_token("reader", &old).await,
            Err(AppError::InvalidCredential)
        ));
        assert_ok!(h.services.accounts.exchange_token("reader", &new).await);
    }

    #[tokio::test]
    async fn test_exchange_unknown_user() {
        let h = Harness::new().await;
        let err = h
            .services
            .accounts
            .exchange_token("ghost", "code")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_mail_failure_keeps_user() {
        let h = Harness::with_failing_mailer().await;

        assert_ok!(h.services.accounts.signup("reader", "reader@example.com").await);
        let user = h.repo.find_user_by_username("reader").await.unwrap().unwrap();
        assert!(user.confirmation_code_hash.is_some());
    }

    struct StalledMailer;

    #[async_trait::async_trait]
    impl Mailer for StalledMailer {
        async fn send(&self, _address: &str, _subject: &str, _body: &str) -> Result<()> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_stalled_delivery_is_cut_off() {
        let h = Harness::new().await;
        let accounts = AccountService::new(
            h.repo.clone(),
            Arc::new(JwtManager::new("test-secret", 3600)),
            Arc::new(StalledMailer),
            Arc::new(crate::clock::SystemClock),
            AccountSettings {
                mail_deadline: Duration::from_millis(50),
                ..AccountSettings::default()
            },
        );

        let receipt = tokio::time::timeout(
            Duration::from_secs(5),
            accounts.signup("reader", "reader@example.com"),
        )
        .await
        .expect("signup waited on the mailer past its deadline");
        assert_ok!(receipt);

        let user = h.repo.find_user_by_username("reader").await.unwrap().unwrap();
        assert!(user.confirmation_code_hash.is_some());
    }

    #[tokio::test]
    async fn test_patch_self_drops_role() {
        let h = Harness::new().await;
        let reader = h.user("reader", Role::User).await;

        let patch = UserPatch {
            bio: Some("Reads a lot".into()),
            role: Some(Role::Admin),
            ..UserPatch::default()
        };
        let updated = assert_ok!(h.services.accounts.patch_self(&reader, patch).await);

        assert_eq!(updated.bio, "Reads a lot");
        assert_eq!(updated.role, Role::User);
    }

    #[tokio::test]
    async fn test_admin_patch_self_changes_role() {
        let h = Harness::new().await;
        let admin = h.user("chief", Role::Admin).await;

        let patch = UserPatch {
            role: Some(Role::Moderator),
            ..UserPatch::default()
        };
        let updated = assert_ok!(h.services.accounts.patch_self(&admin, patch).await);
        assert_eq!(updated.role, Role::Moderator);
    }

    #[tokio::test]
    async fn test_user_admin_requires_admin() {
        let h = Harness::new().await;
        let reader = h.user("reader", Role::User).await;
        let admin = h.user("chief", Role::Admin).await;

        assert!(matches!(
            h.services.accounts.list_users(None, None).await,
            Err(AppError::Unauthorized { .. })
        ));
        assert!(matches!(
            h.services.accounts.get_user(Some(&reader), "chief").await,
            Err(AppError::Forbidden { .. })
        ));

        let users = assert_ok!(h.services.accounts.list_users(Some(&admin), Some("read")).await);
        assert_eq!(users.len(), 1);

        let input = CreateUser {
            username: "mod".into(),
            email: "mod@example.com".into(),
            first_name: None,
            last_name: None,
            bio: String::new(),
            role: Role::Moderator,
        };
        let created = assert_ok!(h.services.accounts.create_user(Some(&admin), input).await);
        assert!(created.is_moderator());

        assert_ok!(h.services.accounts.delete_user(Some(&admin), "mod").await);
        assert!(matches!(
            h.services.accounts.get_user(Some(&admin), "mod").await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_superuser_bootstrap_is_idempotent() {
        let h = Harness::new().await;
        let first = assert_ok!(
            h.services
                .accounts
                .ensure_superuser("root", "root@example.com")
                .await
        );
        let second = assert_ok!(
            h.services
                .accounts
                .ensure_superuser("root", "root@example.com")
                .await
        );

        assert_eq!(first.id, second.id);
        assert!(second.is_admin());
    }
}
