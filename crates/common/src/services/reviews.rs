//! Reviews and comments
//!
//! Both are addressed through their parent: a review through its title, a
//! comment through its title and review. An id that exists under a
//! different parent is reported as not found.

use crate::clock::Clock;
use crate::db::models::{Comment, CommentActiveModel, Review, ReviewActiveModel, User};
use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::permissions::{authorize, Action, Resource};
use crate::validation;
use chrono::{DateTime, FixedOffset};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct ReviewDetails {
    pub id: i32,
    pub title: i32,
    /// Author username
    pub author: String,
    pub text: String,
    pub score: i32,
    pub pub_date: DateTime<FixedOffset>,
}

impl ReviewDetails {
    fn new(review: Review, author: Option<User>) -> Self {
        Self {
            id: review.id,
            title: review.title_id,
            author: author.map(|user| user.username).unwrap_or_default(),
            text: review.text,
            score: review.score,
            pub_date: review.pub_date,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentDetails {
    pub id: i32,
    pub review: i32,
    pub author: String,
    pub text: String,
    pub pub_date: DateTime<FixedOffset>,
}

impl CommentDetails {
    fn new(comment: Comment, author: Option<User>) -> Self {
        Self {
            id: comment.id,
            review: comment.review_id,
            author: author.map(|user| user.username).unwrap_or_default(),
            text: comment.text,
            pub_date: comment.pub_date,
        }
    }
}

/// Client-supplied review fields; author, title and date are never read
/// from the request
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewInput {
    pub text: String,
    pub score: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewPatch {
    pub text: Option<String>,
    pub score: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentInput {
    pub text: String,
}

#[derive(Clone)]
pub struct ReviewService {
    repo: Repository,
    clock: Arc<dyn Clock>,
}

impl ReviewService {
    pub fn new(repo: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    // ========================================================================
    // Reviews
    // ========================================================================

    /// Reviews of a title, newest first
    pub async fn list_reviews(&self, title_id: i32) -> Result<Vec<ReviewDetails>> {
        self.ensure_title(title_id).await?;
        let reviews = self.repo.list_reviews(title_id).await?;
        Ok(reviews
            .into_iter()
            .map(|(review, author)| ReviewDetails::new(review, author))
            .collect())
    }

    pub async fn get_review(&self, title_id: i32, review_id: i32) -> Result<ReviewDetails> {
        let (review, author) = self.review_in_title(title_id, review_id).await?;
        Ok(ReviewDetails::new(review, author))
    }

    /// One review per author and title. The pre-check gives the common case
    /// a clean error; the unique index settles concurrent attempts.
    pub async fn create_review(
        &self,
        actor: Option<&User>,
        title_id: i32,
        input: ReviewInput,
    ) -> Result<ReviewDetails> {
        authorize(actor, Action::Create, Resource::Review { author_id: None })?;
        let author = require_actor(actor)?;

        validation::validate_score(input.score)?;
        validation::validate_text("text", &input.text, validation::REVIEW_TEXT_MAX_LEN)?;
        self.ensure_title(title_id).await?;

        if self
            .repo
            .find_review_by_author(title_id, author.id)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateReview { title_id });
        }

        let review = self
            .repo
            .create_review(title_id, author.id, input.text, input.score, self.clock.now())
            .await?;

        metrics::record_mutation("review", "create");
        info!(review_id = review.id, title_id, author_id = author.id, "Review created");
        Ok(ReviewDetails::new(review, Some(author.clone())))
    }

    pub async fn update_review(
        &self,
        actor: Option<&User>,
        title_id: i32,
        review_id: i32,
        patch: ReviewPatch,
    ) -> Result<ReviewDetails> {
        require_actor(actor)?;
        let (review, author) = self.review_in_title(title_id, review_id).await?;
        authorize(
            actor,
            Action::Update,
            Resource::Review {
                author_id: Some(review.author_id),
            },
        )?;

        let mut active: ReviewActiveModel = review.into();
        if let Some(score) = patch.score {
            validation::validate_score(score)?;
            active.score = Set(score);
        }
        if let Some(text) = patch.text {
            validation::validate_text("text", &text, validation::REVIEW_TEXT_MAX_LEN)?;
            active.text = Set(text);
        }

        let review = self.repo.update_review(active).await?;
        metrics::record_mutation("review", "update");
        info!(review_id = review.id, "Review updated");
        Ok(ReviewDetails::new(review, author))
    }

    /// Deletes the review and every comment on it
    pub async fn delete_review(
        &self,
        actor: Option<&User>,
        title_id: i32,
        review_id: i32,
    ) -> Result<()> {
        require_actor(actor)?;
        let (review, _) = self.review_in_title(title_id, review_id).await?;
        authorize(
            actor,
            Action::Delete,
            Resource::Review {
                author_id: Some(review.author_id),
            },
        )?;

        self.repo.delete_review(review.id).await?;
        metrics::record_mutation("review", "delete");
        info!(review_id = review.id, title_id, "Review deleted");
        Ok(())
    }

    // ========================================================================
    // Comments
    // ========================================================================

    /// Comments of a review, newest first
    pub async fn list_comments(&self, title_id: i32, review_id: i32) -> Result<Vec<CommentDetails>> {
        self.review_in_title(title_id, review_id).await?;
        let comments = self.repo.list_comments(review_id).await?;
        Ok(comments
            .into_iter()
            .map(|(comment, author)| CommentDetails::new(comment, author))
            .collect())
    }

    pub async fn get_comment(
        &self,
        title_id: i32,
        review_id: i32,
        comment_id: i32,
    ) -> Result<CommentDetails> {
        let (comment, author) = self.comment_in_review(title_id, review_id, comment_id).await?;
        Ok(CommentDetails::new(comment, author))
    }

    pub async fn create_comment(
        &self,
        actor: Option<&User>,
        title_id: i32,
        review_id: i32,
        input: CommentInput,
    ) -> Result<CommentDetails> {
        authorize(actor, Action::Create, Resource::Comment { author_id: None })?;
        let author = require_actor(actor)?;

        validation::validate_text("text", &input.text, validation::COMMENT_TEXT_MAX_LEN)?;
        let (review, _) = self.review_in_title(title_id, review_id).await?;

        let comment = self
            .repo
            .create_comment(review.id, author.id, input.text, self.clock.now())
            .await?;

        metrics::record_mutation("comment", "create");
        info!(comment_id = comment.id, review_id, author_id = author.id, "Comment created");
        Ok(CommentDetails::new(comment, Some(author.clone())))
    }

    pub async fn update_comment(
        &self,
        actor: Option<&User>,
        title_id: i32,
        review_id: i32,
        comment_id: i32,
        input: CommentInput,
    ) -> Result<CommentDetails> {
        require_actor(actor)?;
        let (comment, author) = self.comment_in_review(title_id, review_id, comment_id).await?;
        authorize(
            actor,
            Action::Update,
            Resource::Comment {
                author_id: Some(comment.author_id),
            },
        )?;
        validation::validate_text("text", &input.text, validation::COMMENT_TEXT_MAX_LEN)?;

        let mut active: CommentActiveModel = comment.into();
        active.text = Set(input.text);

        let comment = self.repo.update_comment(active).await?;
        metrics::record_mutation("comment", "update");
        info!(comment_id = comment.id, "Comment updated");
        Ok(CommentDetails::new(comment, author))
    }

    pub async fn delete_comment(
        &self,
        actor: Option<&User>,
        title_id: i32,
        review_id: i32,
        comment_id: i32,
    ) -> Result<()> {
        require_actor(actor)?;
        let (comment, _) = self.comment_in_review(title_id, review_id, comment_id).await?;
        authorize(
            actor,
            Action::Delete,
            Resource::Comment {
                author_id: Some(comment.author_id),
            },
        )?;

        self.repo.delete_comment(comment.id).await?;
        metrics::record_mutation("comment", "delete");
        info!(comment_id = comment.id, review_id, "Comment deleted");
        Ok(())
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    async fn ensure_title(&self, title_id: i32) -> Result<()> {
        self.repo
            .find_title_by_id(title_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("title", title_id))
    }

    async fn review_in_title(
        &self,
        title_id: i32,
        review_id: i32,
    ) -> Result<(Review, Option<User>)> {
        self.ensure_title(title_id).await?;
        self.repo
            .find_review(title_id, review_id)
            .await?
            .ok_or_else(|| AppError::not_found("review", review_id))
    }

    async fn comment_in_review(
        &self,
        title_id: i32,
        review_id: i32,
        comment_id: i32,
    ) -> Result<(Comment, Option<User>)> {
        self.review_in_title(title_id, review_id).await?;
        self.repo
            .find_comment(review_id, comment_id)
            .await?
            .ok_or_else(|| AppError::not_found("comment", comment_id))
    }
}

/// Writes need an actor before the target is even looked up
fn require_actor(actor: Option<&User>) -> Result<&User> {
    actor.ok_or_else(|| AppError::Unauthorized {
        message: "Authentication credentials were not provided".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;
    use crate::services::testing::Harness;
    use tokio_test::assert_ok;

    fn review(score: i32) -> ReviewInput {
        ReviewInput {
            text: "Worth the time".into(),
            score,
        }
    }

    fn comment(text: &str) -> CommentInput {
        CommentInput { text: text.into() }
    }

    #[tokio::test]
    async fn test_one_review_per_author_and_title() {
        let h = Harness::with_catalog().await;
        let title = h.title().await;
        let reader = h.user("reader", Role::User).await;
        let reviews = &h.services.reviews;

        assert_ok!(reviews.create_review(Some(&reader), title, review(8)).await);
        let err = reviews
            .create_review(Some(&reader), title, review(3))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateReview { .. }));
        assert_eq!(h.repo.count_reviews(title).await.unwrap(), 1);
        assert_eq!(h.repo.average_score(title).await.unwrap(), Some(8.0));
    }

    #[tokio::test]
    async fn test_rating_follows_reviews() {
        let h = Harness::with_catalog().await;
        let title = h.title().await;
        let first = h.user("first", Role::User).await;
        let second = h.user("second", Role::User).await;

        assert_eq!(h.services.catalog.get_title(title).await.unwrap().rating, None);

        assert_ok!(h.services.reviews.create_review(Some(&first), title, review(7)).await);
        assert_eq!(h.services.catalog.get_title(title).await.unwrap().rating, Some(7.0));

        assert_ok!(h.services.reviews.create_review(Some(&second), title, review(4)).await);
        assert_eq!(h.services.catalog.get_title(title).await.unwrap().rating, Some(5.5));
    }

    #[tokio::test]
    async fn test_review_validation() {
        let h = Harness::with_catalog().await;
        let title = h.title().await;
        let reader = h.user("reader", Role::User).await;
        let reviews = &h.services.reviews;

        for score in [0, 11] {
            let err = reviews
                .create_review(Some(&reader), title, review(score))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation { .. }));
        }

        let long = ReviewInput {
            text: "x".repeat(validation::REVIEW_TEXT_MAX_LEN + 1),
            score: 5,
        };
        assert!(matches!(
            reviews.create_review(Some(&reader), title, long).await,
            Err(AppError::Validation { .. })
        ));

        assert!(matches!(
            reviews.create_review(None, title, review(5)).await,
            Err(AppError::Unauthorized { .. })
        ));
        assert!(matches!(
            reviews.create_review(Some(&reader), title + 100, review(5)).await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_stranger_cannot_delete_review() {
        let h = Harness::with_catalog().await;
        let title = h.title().await;
        let author = h.user("author", Role::User).await;
        let stranger = h.user("stranger", Role::User).await;
        let reviews = &h.services.reviews;

        let created = assert_ok!(reviews.create_review(Some(&author), title, review(9)).await);

        let err = reviews
            .delete_review(Some(&stranger), title, created.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));

        let read = assert_ok!(reviews.get_review(title, created.id).await);
        assert_eq!(read.author, "author");
        assert_eq!(read.score, 9);

        assert!(matches!(
            reviews.delete_review(None, title, created.id).await,
            Err(AppError::Unauthorized { .. })
        ));
    }

    #[tokio::test]
    async fn test_moderator_and_author_may_edit() {
        let h = Harness::with_catalog().await;
        let title = h.title().await;
        let author = h.user("author", Role::User).await;
        let moderator = h.user("mod", Role::Moderator).await;
        let reviews = &h.services.reviews;

        let created = assert_ok!(reviews.create_review(Some(&author), title, review(9)).await);

        let patch = ReviewPatch {
            score: Some(6),
            ..ReviewPatch::default()
        };
        let updated = assert_ok!(
            reviews
                .update_review(Some(&author), title, created.id, patch)
                .await
        );
        assert_eq!(updated.score, 6);
        assert_eq!(updated.author, "author");

        let c = assert_ok!(
            reviews
                .create_comment(Some(&author), title, created.id, comment("Agreed"))
                .await
        );
        assert_ok!(
            reviews
                .update_comment(Some(&moderator), title, created.id, c.id, comment("Edited"))
                .await
        );
        assert_ok!(reviews.delete_review(Some(&moderator), title, created.id).await);
    }

    #[tokio::test]
    async fn test_lists_are_newest_first() {
        let h = Harness::with_catalog().await;
        let title = h.title().await;
        let first = h.user("first", Role::User).await;
        let second = h.user("second", Role::User).await;
        let reviews = &h.services.reviews;

        let older = assert_ok!(reviews.create_review(Some(&first), title, review(5)).await);
        let newer = assert_ok!(reviews.create_review(Some(&second), title, review(6)).await);

        let listed = assert_ok!(reviews.list_reviews(title).await);
        let ids: Vec<i32> = listed.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);

        // Several comments by one author are fine
        let a = assert_ok!(
            reviews
                .create_comment(Some(&first), title, older.id, comment("one"))
                .await
        );
        let b = assert_ok!(
            reviews
                .create_comment(Some(&first), title, older.id, comment("two"))
                .await
        );
        let listed = assert_ok!(reviews.list_comments(title, older.id).await);
        let ids: Vec<i32> = listed.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn test_wrong_parent_is_not_found() {
        let h = Harness::with_catalog().await;
        let title = h.title().await;
        let other = h.title_named("Another Walk").await;
        let reader = h.user("reader", Role::User).await;
        let reviews = &h.services.reviews;

        let created = assert_ok!(reviews.create_review(Some(&reader), title, review(5)).await);
        let c = assert_ok!(
            reviews
                .create_comment(Some(&reader), title, created.id, comment("note"))
                .await
        );

        assert!(matches!(
            reviews.get_review(other, created.id).await,
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            reviews.get_comment(other, created.id, c.id).await,
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            reviews.delete_comment(Some(&reader), other, created.id, c.id).await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_comment_length() {
        let h = Harness::with_catalog().await;
        let title = h.title().await;
        let reader = h.user("reader", Role::User).await;
        let reviews = &h.services.reviews;
        let created = assert_ok!(reviews.create_review(Some(&reader), title, review(5)).await);

        let long = comment(&"y".repeat(validation::COMMENT_TEXT_MAX_LEN + 1));
        assert!(matches!(
            reviews.create_comment(Some(&reader), title, created.id, long).await,
            Err(AppError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_deleting_title_cascades() {
        let h = Harness::with_catalog().await;
        let title = h.title().await;
        let admin = h.user("chief", Role::Admin).await;
        let reader = h.user("reader", Role::User).await;
        let reviews = &h.services.reviews;

        let r = assert_ok!(reviews.create_review(Some(&reader), title, review(5)).await);
        assert_ok!(
            reviews
                .create_comment(Some(&admin), title, r.id, comment("First!"))
                .await
        );
        assert_eq!(h.repo.count_comments(r.id).await.unwrap(), 1);
        assert_eq!(h.repo.count_genre_links(title).await.unwrap(), 1);

        assert_ok!(h.services.catalog.delete_title(Some(&admin), title).await);

        assert_eq!(h.repo.count_reviews(title).await.unwrap(), 0);
        assert_eq!(h.repo.count_comments(r.id).await.unwrap(), 0);
        assert_eq!(h.repo.count_genre_links(title).await.unwrap(), 0);
        assert!(matches!(
            reviews.list_reviews(title).await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_deleting_user_removes_their_reviews() {
        let h = Harness::with_catalog().await;
        let title = h.title().await;
        let admin = h.user("chief", Role::Admin).await;
        let reader = h.user("reader", Role::User).await;

        let r = assert_ok!(
            h.services
                .reviews
                .create_review(Some(&reader), title, review(2))
                .await
        );
        assert_ok!(
            h.services
                .reviews
                .create_comment(Some(&admin), title, r.id, comment("Harsh"))
                .await
        );

        assert_ok!(h.services.accounts.delete_user(Some(&admin), "reader").await);

        assert_eq!(h.repo.count_reviews(title).await.unwrap(), 0);
        assert_eq!(h.repo.count_comments(r.id).await.unwrap(), 0);
    }
}
