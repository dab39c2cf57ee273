//! Permission evaluation
//!
//! `can` is a pure decision over (actor, action, resource) and never fails.
//! `authorize` turns a denial into `Unauthorized` for anonymous actors and
//! `Forbidden` for authenticated ones.

use crate::db::models::User;
use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    /// List and retrieve
    pub fn is_read(self) -> bool {
        matches!(self, Action::Read)
    }
}

/// What an action targets, with the ownership facts the decision needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Category,
    Genre,
    Title,
    /// The user collection (listing, admin creation)
    Users,
    /// A single user record
    User { id: i32 },
    /// The role field of a user record
    UserRole { id: i32 },
    /// `author_id` is `None` when the review does not exist yet
    Review { author_id: Option<i32> },
    Comment { author_id: Option<i32> },
}

/// Decide whether `actor` may perform `action` on `resource`
pub fn can(actor: Option<&User>, action: Action, resource: Resource) -> bool {
    match resource {
        Resource::Category | Resource::Genre | Resource::Title => {
            action.is_read() || actor.is_some_and(User::is_admin)
        }
        Resource::Users | Resource::UserRole { .. } => actor.is_some_and(User::is_admin),
        Resource::User { id } => match actor {
            None => false,
            Some(user) if user.is_admin() => true,
            Some(user) => user.is_self(id) && matches!(action, Action::Read | Action::Update),
        },
        Resource::Review { author_id } | Resource::Comment { author_id } => {
            if action.is_read() {
                return true;
            }
            let Some(user) = actor else {
                return false;
            };
            match action {
                Action::Create => true,
                _ => {
                    user.is_admin()
                        || user.is_moderator()
                        || author_id.is_some_and(|author| user.is_self(author))
                }
            }
        }
    }
}

/// `can`, as an error for the caller to propagate
pub fn authorize(actor: Option<&User>, action: Action, resource: Resource) -> Result<()> {
    if can(actor, action, resource) {
        return Ok(());
    }

    match actor {
        None => Err(AppError::Unauthorized {
            message: "Authentication credentials were not provided".to_string(),
        }),
        Some(user) => {
            tracing::debug!(
                user_id = user.id,
                action = ?action,
                resource = ?resource,
                "Permission denied"
            );
            Err(AppError::Forbidden {
                message: format!("You do not have permission to {:?} this resource", action)
                    .to_lowercase(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;

    fn user(id: i32, role: Role, is_superuser: bool) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            first_name: None,
            last_name: None,
            bio: String::new(),
            role,
            is_superuser,
            confirmation_code_hash: None,
            created_at: chrono::Utc::now().into(),
        }
    }

    const WRITES: [Action; 3] = [Action::Create, Action::Update, Action::Delete];

    #[test]
    fn test_reads_open_to_anonymous() {
        for resource in [
            Resource::Category,
            Resource::Genre,
            Resource::Title,
            Resource::Review { author_id: Some(1) },
            Resource::Comment { author_id: Some(1) },
        ] {
            assert!(can(None, Action::Read, resource), "{resource:?}");
        }
    }

    #[test]
    fn test_catalog_writes_admin_only() {
        let admin = user(1, Role::Admin, false);
        let superuser = user(2, Role::User, true);
        let moderator = user(3, Role::Moderator, false);
        let plain = user(4, Role::User, false);

        for action in WRITES {
            for resource in [Resource::Category, Resource::Genre, Resource::Title] {
                assert!(can(Some(&admin), action, resource));
                assert!(can(Some(&superuser), action, resource));
                assert!(!can(Some(&moderator), action, resource));
                assert!(!can(Some(&plain), action, resource));
                assert!(!can(None, action, resource));
            }
        }
    }

    #[test]
    fn test_review_ownership() {
        let author = user(10, Role::User, false);
        let stranger = user(11, Role::User, false);
        let moderator = user(12, Role::Moderator, false);
        let admin = user(13, Role::Admin, false);
        let review = Resource::Review { author_id: Some(10) };

        for action in [Action::Update, Action::Delete] {
            assert!(can(Some(&author), action, review));
            assert!(can(Some(&moderator), action, review));
            assert!(can(Some(&admin), action, review));
            assert!(!can(Some(&stranger), action, review));
            assert!(!can(None, action, review));
        }
        assert!(can(Some(&stranger), Action::Read, review));
    }

    #[test]
    fn test_create_needs_only_authentication() {
        let plain = user(5, Role::User, false);
        let new_comment = Resource::Comment { author_id: None };

        assert!(can(Some(&plain), Action::Create, new_comment));
        assert!(!can(None, Action::Create, new_comment));
    }

    #[test]
    fn test_user_records() {
        let admin = user(1, Role::Admin, false);
        let plain = user(5, Role::User, false);

        assert!(can(Some(&plain), Action::Read, Resource::User { id: 5 }));
        assert!(can(Some(&plain), Action::Update, Resource::User { id: 5 }));
        assert!(!can(Some(&plain), Action::Delete, Resource::User { id: 5 }));
        assert!(!can(Some(&plain), Action::Read, Resource::User { id: 6 }));
        assert!(!can(Some(&plain), Action::Read, Resource::Users));
        assert!(!can(Some(&plain), Action::Update, Resource::UserRole { id: 5 }));

        assert!(can(Some(&admin), Action::Delete, Resource::User { id: 5 }));
        assert!(can(Some(&admin), Action::Update, Resource::UserRole { id: 1 }));
        assert!(!can(None, Action::Read, Resource::Users));
    }

    #[test]
    fn test_authorize_error_kinds() {
        let plain = user(5, Role::User, false);
        let review = Resource::Review { author_id: Some(99) };

        assert!(matches!(
            authorize(None, Action::Delete, review),
            Err(AppError::Unauthorized { .. })
        ));
        assert!(matches!(
            authorize(Some(&plain), Action::Delete, review),
            Err(AppError::Forbidden { .. })
        ));
        assert!(authorize(Some(&plain), Action::Read, review).is_ok());
    }
}
