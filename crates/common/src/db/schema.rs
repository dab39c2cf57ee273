//! Schema bootstrap
//!
//! Tables come from the entity definitions (foreign keys and their
//! on-delete rules included); the composite unique constraints are added as
//! unique indexes. Every statement is idempotent.

use crate::db::models::*;
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, EntityTrait, Schema};
use tracing::info;

/// Create all tables and unique indexes if they do not exist yet
pub async fn create_schema<C: ConnectionTrait>(db: &C) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    // Parents before children so foreign keys resolve
    create_table(db, &schema, UserEntity).await?;
    create_table(db, &schema, CategoryEntity).await?;
    create_table(db, &schema, GenreEntity).await?;
    create_table(db, &schema, TitleEntity).await?;
    create_table(db, &schema, GenreTitleEntity).await?;
    create_table(db, &schema, ReviewEntity).await?;
    create_table(db, &schema, CommentEntity).await?;

    for index in unique_indexes() {
        db.execute(db.get_database_backend().build(&index)).await?;
    }

    info!("Database schema ready");
    Ok(())
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(db.get_database_backend().build(&stmt)).await?;
    Ok(())
}

fn unique_indexes() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .name("uq_users_username_email")
            .table(UserEntity)
            .col(UserColumn::Username)
            .col(UserColumn::Email)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_genre_titles_genre_title")
            .table(GenreTitleEntity)
            .col(GenreTitleColumn::GenreId)
            .col(GenreTitleColumn::TitleId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_reviews_author_title")
            .table(ReviewEntity)
            .col(ReviewColumn::AuthorId)
            .col(ReviewColumn::TitleId)
            .unique()
            .if_not_exists()
            .to_owned(),
    ]
}
