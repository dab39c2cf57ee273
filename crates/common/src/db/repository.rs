//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support. Multi-step
//! mutations run in a single transaction and perform their cascades
//! explicitly, so they hold whether or not the backend enforces
//! foreign keys.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Alias, Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, NotSet,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;

/// Title list filters; every field narrows the result
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleFilter {
    /// Category slug
    pub category: Option<String>,
    /// Genre slug
    pub genre: Option<String>,
    pub name: Option<String>,
    pub year: Option<i32>,
}

/// Fields of a user created by an administrator
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: String,
    pub role: Role,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    pub async fn find_user_by_id(&self, id: i32) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Username.eq(username))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// List users, newest first, optionally narrowed by a username fragment
    pub async fn list_users(&self, search: Option<&str>) -> Result<Vec<User>> {
        let mut query = UserEntity::find().order_by_desc(UserColumn::Id);

        if let Some(term) = search.filter(|t| !t.is_empty()) {
            query = query.filter(UserColumn::Username.contains(term));
        }

        query.all(self.conn()).await.map_err(Into::into)
    }

    /// Signup get-or-create, atomically. Returns the user and whether it
    /// was created.
    ///
    /// Email and username are looked up independently: both absent creates
    /// the user, both naming the same user refreshes its code, anything
    /// else is a credentials mismatch.
    pub async fn register_signup(
        &self,
        username: &str,
        email: &str,
        code_hash: String,
        now: DateTime<Utc>,
    ) -> Result<(User, bool)> {
        let txn = self.conn().begin().await?;

        let by_email = UserEntity::find()
            .filter(UserColumn::Email.eq(email))
            .one(&txn)
            .await?;
        let by_username = UserEntity::find()
            .filter(UserColumn::Username.eq(username))
            .one(&txn)
            .await?;

        let outcome = match (by_email, by_username) {
            (None, None) => {
                let user = UserActiveModel {
                    id: NotSet,
                    username: Set(username.to_string()),
                    email: Set(email.to_string()),
                    first_name: Set(None),
                    last_name: Set(None),
                    bio: Set(String::new()),
                    role: Set(Role::User),
                    is_superuser: Set(false),
                    confirmation_code_hash: Set(Some(code_hash)),
                    created_at: Set(now.into()),
                };
                (user.insert(&txn).await?, true)
            }
            (Some(existing), Some(same)) if existing.id == same.id => {
                let mut user: UserActiveModel = existing.into();
                user.confirmation_code_hash = Set(Some(code_hash));
                (user.update(&txn).await?, false)
            }
            _ => return Err(AppError::CredentialsMismatch),
        };

        txn.commit().await?;
        Ok(outcome)
    }

    /// Insert a user created by an administrator
    pub async fn create_user(&self, new_user: NewUser, now: DateTime<Utc>) -> Result<User> {
        let user = UserActiveModel {
            id: NotSet,
            username: Set(new_user.username),
            email: Set(new_user.email),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            bio: Set(new_user.bio),
            role: Set(new_user.role),
            is_superuser: Set(false),
            confirmation_code_hash: Set(None),
            created_at: Set(now.into()),
        };

        user.insert(self.conn()).await.map_err(Into::into)
    }

    /// Persist changed user fields
    pub async fn update_user(&self, user: UserActiveModel) -> Result<User> {
        user.update(self.conn()).await.map_err(Into::into)
    }

    /// Get-or-create a superuser and make sure the flag is set
    pub async fn ensure_superuser(
        &self,
        username: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<User> {
        let txn = self.conn().begin().await?;

        let existing = UserEntity::find()
            .filter(UserColumn::Username.eq(username))
            .one(&txn)
            .await?;

        let user = match existing {
            Some(user) if user.is_superuser => user,
            Some(user) => {
                let mut active: UserActiveModel = user.into();
                active.is_superuser = Set(true);
                active.update(&txn).await?
            }
            None => {
                let user = UserActiveModel {
                    id: NotSet,
                    username: Set(username.to_string()),
                    email: Set(email.to_string()),
                    first_name: Set(None),
                    last_name: Set(None),
                    bio: Set(String::new()),
                    role: Set(Role::Admin),
                    is_superuser: Set(true),
                    confirmation_code_hash: Set(None),
                    created_at: Set(now.into()),
                };
                user.insert(&txn).await?
            }
        };

        txn.commit().await?;
        Ok(user)
    }

    /// Delete a user with everything they authored, plus comments left on
    /// their reviews by others
    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        let txn = self.conn().begin().await?;

        let review_ids: Vec<i32> = ReviewEntity::find()
            .select_only()
            .column(ReviewColumn::Id)
            .filter(ReviewColumn::AuthorId.eq(id))
            .into_tuple()
            .all(&txn)
            .await?;

        CommentEntity::delete_many()
            .filter(
                CommentColumn::AuthorId
                    .eq(id)
                    .or(CommentColumn::ReviewId.is_in(review_ids)),
            )
            .exec(&txn)
            .await?;

        ReviewEntity::delete_many()
            .filter(ReviewColumn::AuthorId.eq(id))
            .exec(&txn)
            .await?;

        let result = UserEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Category Operations
    // ========================================================================

    pub async fn list_categories(&self, search: Option<&str>) -> Result<Vec<Category>> {
        let mut query = CategoryEntity::find().order_by_asc(CategoryColumn::Name);

        if let Some(term) = search.filter(|t| !t.is_empty()) {
            query = query.filter(CategoryColumn::Name.contains(term));
        }

        query.all(self.conn()).await.map_err(Into::into)
    }

    pub async fn find_category_by_id(&self, id: i32) -> Result<Option<Category>> {
        CategoryEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        CategoryEntity::find()
            .filter(CategoryColumn::Slug.eq(slug))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn create_category(&self, name: String, slug: String) -> Result<Category> {
        let category = CategoryActiveModel {
            id: NotSet,
            name: Set(name),
            slug: Set(slug),
        };

        category.insert(self.conn()).await.map_err(Into::into)
    }

    pub async fn update_category(&self, category: CategoryActiveModel) -> Result<Category> {
        category.update(self.conn()).await.map_err(Into::into)
    }

    /// Delete a category; titles referencing it are detached, not deleted
    pub async fn delete_category(&self, id: i32) -> Result<bool> {
        let txn = self.conn().begin().await?;

        TitleEntity::update_many()
            .col_expr(TitleColumn::CategoryId, Expr::value(Option::<i32>::None))
            .filter(TitleColumn::CategoryId.eq(id))
            .exec(&txn)
            .await?;

        let result = CategoryEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Genre Operations
    // ========================================================================

    pub async fn list_genres(&self, search: Option<&str>) -> Result<Vec<Genre>> {
        let mut query = GenreEntity::find().order_by_asc(GenreColumn::Name);

        if let Some(term) = search.filter(|t| !t.is_empty()) {
            query = query.filter(GenreColumn::Name.contains(term));
        }

        query.all(self.conn()).await.map_err(Into::into)
    }

    pub async fn find_genre_by_slug(&self, slug: &str) -> Result<Option<Genre>> {
        GenreEntity::find()
            .filter(GenreColumn::Slug.eq(slug))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn create_genre(&self, name: String, slug: String) -> Result<Genre> {
        let genre = GenreActiveModel {
            id: NotSet,
            name: Set(name),
            slug: Set(slug),
        };

        genre.insert(self.conn()).await.map_err(Into::into)
    }

    pub async fn update_genre(&self, genre: GenreActiveModel) -> Result<Genre> {
        genre.update(self.conn()).await.map_err(Into::into)
    }

    /// Delete a genre and its join rows; the titles stay
    pub async fn delete_genre(&self, id: i32) -> Result<bool> {
        let txn = self.conn().begin().await?;

        GenreTitleEntity::delete_many()
            .filter(GenreTitleColumn::GenreId.eq(id))
            .exec(&txn)
            .await?;

        let result = GenreEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Title Operations
    // ========================================================================

    /// List titles ordered by name. An unknown category or genre slug
    /// matches nothing.
    pub async fn list_titles(&self, filter: &TitleFilter) -> Result<Vec<Title>> {
        let mut query = TitleEntity::find()
            .order_by_asc(TitleColumn::Name)
            .order_by_asc(TitleColumn::Id);

        if let Some(slug) = filter.category.as_deref() {
            let Some(category) = self.find_category_by_slug(slug).await? else {
                return Ok(Vec::new());
            };
            query = query.filter(TitleColumn::CategoryId.eq(category.id));
        }

        if let Some(slug) = filter.genre.as_deref() {
            let Some(genre) = self.find_genre_by_slug(slug).await? else {
                return Ok(Vec::new());
            };
            let title_ids: Vec<i32> = GenreTitleEntity::find()
                .select_only()
                .column(GenreTitleColumn::TitleId)
                .filter(GenreTitleColumn::GenreId.eq(genre.id))
                .into_tuple()
                .all(self.conn())
                .await?;
            query = query.filter(TitleColumn::Id.is_in(title_ids));
        }

        if let Some(name) = filter.name.as_deref() {
            query = query.filter(TitleColumn::Name.eq(name));
        }

        if let Some(year) = filter.year {
            query = query.filter(TitleColumn::Year.eq(year));
        }

        query.all(self.conn()).await.map_err(Into::into)
    }

    pub async fn find_title_by_id(&self, id: i32) -> Result<Option<Title>> {
        TitleEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Genres attached to a title, by name
    pub async fn title_genres(&self, title: &Title) -> Result<Vec<Genre>> {
        title
            .find_related(GenreEntity)
            .order_by_asc(GenreColumn::Name)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Number of join rows for a title
    pub async fn count_genre_links(&self, title_id: i32) -> Result<u64> {
        GenreTitleEntity::find()
            .filter(GenreTitleColumn::TitleId.eq(title_id))
            .count(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Insert a title and one join row per genre. A repeated genre trips the
    /// `(genre_id, title_id)` unique index and aborts the whole insert.
    pub async fn create_title(
        &self,
        name: String,
        year: i32,
        description: Option<String>,
        category_id: Option<i32>,
        genre_ids: &[i32],
    ) -> Result<Title> {
        let txn = self.conn().begin().await?;

        let title = TitleActiveModel {
            id: NotSet,
            name: Set(name),
            year: Set(year),
            description: Set(description),
            category_id: Set(category_id),
        }
        .insert(&txn)
        .await?;

        for genre_id in genre_ids {
            GenreTitleActiveModel {
                id: NotSet,
                genre_id: Set(*genre_id),
                title_id: Set(title.id),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(title)
    }

    /// Persist title fields and, when given, replace its genre set
    pub async fn update_title(
        &self,
        title: TitleActiveModel,
        genre_ids: Option<&[i32]>,
    ) -> Result<Title> {
        let txn = self.conn().begin().await?;

        let title = title.update(&txn).await?;

        if let Some(genre_ids) = genre_ids {
            GenreTitleEntity::delete_many()
                .filter(GenreTitleColumn::TitleId.eq(title.id))
                .exec(&txn)
                .await?;

            for genre_id in genre_ids {
                GenreTitleActiveModel {
                    id: NotSet,
                    genre_id: Set(*genre_id),
                    title_id: Set(title.id),
                }
                .insert(&txn)
                .await?;
            }
        }

        txn.commit().await?;
        Ok(title)
    }

    /// Delete a title together with its reviews, their comments and its
    /// genre links
    pub async fn delete_title(&self, id: i32) -> Result<bool> {
        let txn = self.conn().begin().await?;

        let review_ids: Vec<i32> = ReviewEntity::find()
            .select_only()
            .column(ReviewColumn::Id)
            .filter(ReviewColumn::TitleId.eq(id))
            .into_tuple()
            .all(&txn)
            .await?;

        CommentEntity::delete_many()
            .filter(CommentColumn::ReviewId.is_in(review_ids))
            .exec(&txn)
            .await?;

        ReviewEntity::delete_many()
            .filter(ReviewColumn::TitleId.eq(id))
            .exec(&txn)
            .await?;

        GenreTitleEntity::delete_many()
            .filter(GenreTitleColumn::TitleId.eq(id))
            .exec(&txn)
            .await?;

        let result = TitleEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    /// Mean review score of a title, aggregated by the database on every
    /// call; `None` when the title has no reviews.
    ///
    /// The average is cast so Postgres yields a float rather than NUMERIC.
    pub async fn average_score(&self, title_id: i32) -> Result<Option<f64>> {
        let average = Func::cast_as(
            Func::avg(Expr::col(ReviewColumn::Score)),
            Alias::new("double precision"),
        );

        let row: Option<Option<f64>> = ReviewEntity::find()
            .select_only()
            .column_as(SimpleExpr::from(average), "average")
            .filter(ReviewColumn::TitleId.eq(title_id))
            .into_tuple()
            .one(self.conn())
            .await?;
        Ok(row.flatten())
    }

    pub async fn count_reviews(&self, title_id: i32) -> Result<u64> {
        ReviewEntity::find()
            .filter(ReviewColumn::TitleId.eq(title_id))
            .count(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Review Operations
    // ========================================================================

    /// Reviews of a title with their authors, newest first
    pub async fn list_reviews(&self, title_id: i32) -> Result<Vec<(Review, Option<User>)>> {
        ReviewEntity::find()
            .filter(ReviewColumn::TitleId.eq(title_id))
            .find_also_related(UserEntity)
            .order_by_desc(ReviewColumn::PubDate)
            .order_by_desc(ReviewColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// A review, only if it belongs to the given title
    pub async fn find_review(
        &self,
        title_id: i32,
        review_id: i32,
    ) -> Result<Option<(Review, Option<User>)>> {
        ReviewEntity::find_by_id(review_id)
            .filter(ReviewColumn::TitleId.eq(title_id))
            .find_also_related(UserEntity)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_review_by_author(
        &self,
        title_id: i32,
        author_id: i32,
    ) -> Result<Option<Review>> {
        ReviewEntity::find()
            .filter(ReviewColumn::TitleId.eq(title_id))
            .filter(ReviewColumn::AuthorId.eq(author_id))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Insert a review. Losing a race against a concurrent review by the
    /// same author still ends as `DuplicateReview` via the unique index.
    pub async fn create_review(
        &self,
        title_id: i32,
        author_id: i32,
        text: String,
        score: i32,
        now: DateTime<Utc>,
    ) -> Result<Review> {
        let review = ReviewActiveModel {
            id: NotSet,
            title_id: Set(title_id),
            author_id: Set(author_id),
            text: Set(text),
            score: Set(score),
            pub_date: Set(now.into()),
        };

        review.insert(self.conn()).await.map_err(|e| match AppError::from(e) {
            AppError::Conflict { .. } => AppError::DuplicateReview { title_id },
            other => other,
        })
    }

    pub async fn update_review(&self, review: ReviewActiveModel) -> Result<Review> {
        review.update(self.conn()).await.map_err(Into::into)
    }

    /// Delete a review and its comments
    pub async fn delete_review(&self, id: i32) -> Result<bool> {
        let txn = self.conn().begin().await?;

        CommentEntity::delete_many()
            .filter(CommentColumn::ReviewId.eq(id))
            .exec(&txn)
            .await?;

        let result = ReviewEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Comment Operations
    // ========================================================================

    /// Comments of a review with their authors, newest first
    pub async fn list_comments(&self, review_id: i32) -> Result<Vec<(Comment, Option<User>)>> {
        CommentEntity::find()
            .filter(CommentColumn::ReviewId.eq(review_id))
            .find_also_related(UserEntity)
            .order_by_desc(CommentColumn::PubDate)
            .order_by_desc(CommentColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// A comment, only if it belongs to the given review
    pub async fn find_comment(
        &self,
        review_id: i32,
        comment_id: i32,
    ) -> Result<Option<(Comment, Option<User>)>> {
        CommentEntity::find_by_id(comment_id)
            .filter(CommentColumn::ReviewId.eq(review_id))
            .find_also_related(UserEntity)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn create_comment(
        &self,
        review_id: i32,
        author_id: i32,
        text: String,
        now: DateTime<Utc>,
    ) -> Result<Comment> {
        let comment = CommentActiveModel {
            id: NotSet,
            review_id: Set(review_id),
            author_id: Set(author_id),
            text: Set(text),
            pub_date: Set(now.into()),
        };

        comment.insert(self.conn()).await.map_err(Into::into)
    }

    pub async fn update_comment(&self, comment: CommentActiveModel) -> Result<Comment> {
        comment.update(self.conn()).await.map_err(Into::into)
    }

    pub async fn delete_comment(&self, id: i32) -> Result<bool> {
        let result = CommentEntity::delete_by_id(id).exec(self.conn()).await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn count_comments(&self, review_id: i32) -> Result<u64> {
        CommentEntity::find()
            .filter(CommentColumn::ReviewId.eq(review_id))
            .count(self.conn())
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    async fn repo() -> Repository {
        Repository::new(DbPool::in_memory().await.unwrap())
    }

    async fn seed_user(repo: &Repository, name: &str) -> User {
        repo.create_user(
            NewUser {
                username: name.to_string(),
                email: format!("{name}@example.com"),
                first_name: None,
                last_name: None,
                bio: String::new(),
                role: Role::User,
            },
            Utc::now(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_unique_index_guards_reviews() {
        let repo = repo().await;
        let author = seed_user(&repo, "critic").await;
        let title = repo
            .create_title("Dune".into(), 1965, None, None, &[])
            .await
            .unwrap();

        assert_ok!(
            repo.create_review(title.id, author.id, "great".into(), 9, Utc::now())
                .await
        );

        // Bypasses the service-level existence check on purpose
        let err = repo
            .create_review(title.id, author.id, "again".into(), 3, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateReview { title_id } if title_id == title.id));
    }

    #[tokio::test]
    async fn test_signup_never_duplicates_stored_identity() {
        let repo = repo().await;
        let existing = seed_user(&repo, "reader").await;

        // Same username with another email, and the reverse
        let err = repo
            .register_signup("reader", "elsewhere@example.com", "digest".into(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CredentialsMismatch));
        let err = repo
            .register_signup("someone", "reader@example.com", "digest".into(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CredentialsMismatch));

        // The unique columns reject a duplicate that skips the lookup
        let err = repo
            .create_user(
                NewUser {
                    username: "reader".into(),
                    email: "second@example.com".into(),
                    first_name: None,
                    last_name: None,
                    bio: String::new(),
                    role: Role::User,
                },
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));

        let users = repo.list_users(None).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, existing.id);
        assert!(users[0].confirmation_code_hash.is_none());

        let (same, created) = assert_ok!(
            repo.register_signup("reader", "reader@example.com", "digest".into(), Utc::now())
                .await
        );
        assert!(!created);
        assert_eq!(same.id, existing.id);
        assert_eq!(same.confirmation_code_hash.as_deref(), Some("digest"));
    }

    #[tokio::test]
    async fn test_average_score_is_aggregated() {
        let repo = repo().await;
        let title = repo
            .create_title("Dune".into(), 1965, None, None, &[])
            .await
            .unwrap();
        assert_eq!(repo.average_score(title.id).await.unwrap(), None);

        for (name, score) in [("ann", 7), ("bob", 4)] {
            let author = seed_user(&repo, name).await;
            repo.create_review(title.id, author.id, "ok".into(), score, Utc::now())
                .await
                .unwrap();
        }

        assert_eq!(repo.average_score(title.id).await.unwrap(), Some(5.5));
        assert_eq!(repo.count_reviews(title.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_repeated_genre_rolls_back_title() {
        let repo = repo().await;
        let genre = repo.create_genre("Drama".into(), "drama".into()).await.unwrap();

        let err = repo
            .create_title("Hamlet".into(), 1603, None, None, &[genre.id, genre.id])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));

        let titles = repo.list_titles(&TitleFilter::default()).await.unwrap();
        assert!(titles.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_conflict() {
        let repo = repo().await;
        repo.create_category("Films".into(), "films".into()).await.unwrap();

        let err = repo
            .create_category("Movies".into(), "films".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_title_filters() {
        let repo = repo().await;
        let books = repo.create_category("Books".into(), "books".into()).await.unwrap();
        let scifi = repo.create_genre("Sci-Fi".into(), "sci-fi".into()).await.unwrap();
        let poetry = repo.create_genre("Poetry".into(), "poetry".into()).await.unwrap();

        repo.create_title("Dune".into(), 1965, None, Some(books.id), &[scifi.id])
            .await
            .unwrap();
        repo.create_title("Odyssey".into(), -700, None, None, &[poetry.id])
            .await
            .unwrap();

        let by_category = repo
            .list_titles(&TitleFilter { category: Some("books".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].name, "Dune");

        let by_genre = repo
            .list_titles(&TitleFilter { genre: Some("poetry".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(by_genre.len(), 1);
        assert_eq!(by_genre[0].name, "Odyssey");

        let unknown = repo
            .list_titles(&TitleFilter { genre: Some("western".into()), ..Default::default() })
            .await
            .unwrap();
        assert!(unknown.is_empty());

        let all = repo.list_titles(&TitleFilter::default()).await.unwrap();
        assert_eq!(all.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), ["Dune", "Odyssey"]);
    }
}
