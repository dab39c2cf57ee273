//! Categories, genres and titles

use crate::clock::Clock;
use crate::db::models::{
    Category, CategoryActiveModel, Genre, GenreActiveModel, Title, TitleActiveModel, User,
};
use crate::db::{Repository, TitleFilter};
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::permissions::{authorize, Action, Resource};
use crate::validation;
use futures::future::try_join_all;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// A category or genre as clients see it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Taxon {
    pub name: String,
    pub slug: String,
}

impl From<Category> for Taxon {
    fn from(category: Category) -> Self {
        Self {
            name: category.name,
            slug: category.slug,
        }
    }
}

impl From<Genre> for Taxon {
    fn from(genre: Genre) -> Self {
        Self {
            name: genre.name,
            slug: genre.slug,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaxonInput {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxonPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
}

/// A title with its category, genres and current rating
#[derive(Debug, Clone, Serialize)]
pub struct TitleDetails {
    pub id: i32,
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    pub category: Option<Taxon>,
    pub genre: Vec<Taxon>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTitle {
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    /// Category slug
    pub category: Option<String>,
    /// Genre slugs
    #[serde(default)]
    pub genre: Vec<String>,
}

/// Partial title update. For `description` and `category` the outer
/// `None` leaves the field alone and `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct TitlePatch {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<Option<String>>,
    /// Category slug
    pub category: Option<Option<String>>,
    pub genre: Option<Vec<String>>,
}

fn validate_taxon(name: &str, slug: &str) -> Result<()> {
    validation::validate_text("name", name, validation::NAME_MAX_LEN)?;
    validation::validate_slug(slug)
}

#[derive(Clone)]
pub struct CatalogService {
    repo: Repository,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    pub fn new(repo: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    // ========================================================================
    // Categories
    // ========================================================================

    pub async fn list_categories(&self, search: Option<&str>) -> Result<Vec<Taxon>> {
        let categories = self.repo.list_categories(search).await?;
        Ok(categories.into_iter().map(Taxon::from).collect())
    }

    pub async fn create_category(&self, actor: Option<&User>, input: TaxonInput) -> Result<Taxon> {
        authorize(actor, Action::Create, Resource::Category)?;
        validate_taxon(&input.name, &input.slug)?;

        let category = self.repo.create_category(input.name, input.slug).await?;
        metrics::record_mutation("category", "create");
        info!(category_id = category.id, slug = %category.slug, "Category created");
        Ok(category.into())
    }

    pub async fn update_category(
        &self,
        actor: Option<&User>,
        slug: &str,
        patch: TaxonPatch,
    ) -> Result<Taxon> {
        authorize(actor, Action::Update, Resource::Category)?;
        let category = self.category_by_slug(slug).await?;

        let mut active: CategoryActiveModel = category.into();
        if let Some(name) = patch.name {
            validation::validate_text("name", &name, validation::NAME_MAX_LEN)?;
            active.name = Set(name);
        }
        if let Some(slug) = patch.slug {
            validation::validate_slug(&slug)?;
            active.slug = Set(slug);
        }

        let category = self.repo.update_category(active).await?;
        metrics::record_mutation("category", "update");
        info!(category_id = category.id, "Category updated");
        Ok(category.into())
    }

    /// Titles in the category stay and lose their category
    pub async fn delete_category(&self, actor: Option<&User>, slug: &str) -> Result<()> {
        authorize(actor, Action::Delete, Resource::Category)?;
        let category = self.category_by_slug(slug).await?;

        self.repo.delete_category(category.id).await?;
        metrics::record_mutation("category", "delete");
        info!(category_id = category.id, "Category deleted");
        Ok(())
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Category> {
        self.repo
            .find_category_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found("category", slug))
    }

    // ========================================================================
    // Genres
    // ========================================================================

    pub async fn list_genres(&self, search: Option<&str>) -> Result<Vec<Taxon>> {
        let genres = self.repo.list_genres(search).await?;
        Ok(genres.into_iter().map(Taxon::from).collect())
    }

    pub async fn create_genre(&self, actor: Option<&User>, input: TaxonInput) -> Result<Taxon> {
        authorize(actor, Action::Create, Resource::Genre)?;
        validate_taxon(&input.name, &input.slug)?;

        let genre = self.repo.create_genre(input.name, input.slug).await?;
        metrics::record_mutation("genre", "create");
        info!(genre_id = genre.id, slug = %genre.slug, "Genre created");
        Ok(genre.into())
    }

    pub async fn update_genre(
        &self,
        actor: Option<&User>,
        slug: &str,
        patch: TaxonPatch,
    ) -> Result<Taxon> {
        authorize(actor, Action::Update, Resource::Genre)?;
        let genre = self.genre_by_slug(slug).await?;

        let mut active: GenreActiveModel = genre.into();
        if let Some(name) = patch.name {
            validation::validate_text("name", &name, validation::NAME_MAX_LEN)?;
            active.name = Set(name);
        }
        if let Some(slug) = patch.slug {
            validation::validate_slug(&slug)?;
            active.slug = Set(slug);
        }

        let genre = self.repo.update_genre(active).await?;
        metrics::record_mutation("genre", "update");
        info!(genre_id = genre.id, "Genre updated");
        Ok(genre.into())
    }

    /// Titles keep their remaining genres; only the links go
    pub async fn delete_genre(&self, actor: Option<&User>, slug: &str) -> Result<()> {
        authorize(actor, Action::Delete, Resource::Genre)?;
        let genre = self.genre_by_slug(slug).await?;

        self.repo.delete_genre(genre.id).await?;
        metrics::record_mutation("genre", "delete");
        info!(genre_id = genre.id, "Genre deleted");
        Ok(())
    }

    async fn genre_by_slug(&self, slug: &str) -> Result<Genre> {
        self.repo
            .find_genre_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found("genre", slug))
    }

    async fn resolve_genres(&self, slugs: &[String]) -> Result<Vec<i32>> {
        let mut ids = Vec::with_capacity(slugs.len());
        for slug in slugs {
            ids.push(self.genre_by_slug(slug).await?.id);
        }
        Ok(ids)
    }

    // ========================================================================
    // Titles
    // ========================================================================

    pub async fn list_titles(&self, filter: &TitleFilter) -> Result<Vec<TitleDetails>> {
        let titles = self.repo.list_titles(filter).await?;
        try_join_all(titles.into_iter().map(|title| self.details(title))).await
    }

    pub async fn get_title(&self, id: i32) -> Result<TitleDetails> {
        let title = self.title_by_id(id).await?;
        self.details(title).await
    }

    /// Average review score, read fresh on every call
    pub async fn compute_rating(&self, title_id: i32) -> Result<Option<f64>> {
        self.repo.average_score(title_id).await
    }

    pub async fn create_title(
        &self,
        actor: Option<&User>,
        input: CreateTitle,
    ) -> Result<TitleDetails> {
        authorize(actor, Action::Create, Resource::Title)?;
        validation::validate_text("name", &input.name, validation::NAME_MAX_LEN)?;
        validation::validate_year(input.year, self.clock.current_year())?;
        validation::validate_genres(&input.genre)?;

        let category_id = match input.category.as_deref() {
            Some(slug) => Some(self.category_by_slug(slug).await?.id),
            None => None,
        };
        let genre_ids = self.resolve_genres(&input.genre).await?;

        let title = self
            .repo
            .create_title(input.name, input.year, input.description, category_id, &genre_ids)
            .await?;

        metrics::record_mutation("title", "create");
        info!(title_id = title.id, genres = genre_ids.len(), "Title created");
        self.details(title).await
    }

    pub async fn update_title(
        &self,
        actor: Option<&User>,
        id: i32,
        patch: TitlePatch,
    ) -> Result<TitleDetails> {
        authorize(actor, Action::Update, Resource::Title)?;
        let title = self.title_by_id(id).await?;

        let mut active: TitleActiveModel = title.into();
        if let Some(name) = patch.name {
            validation::validate_text("name", &name, validation::NAME_MAX_LEN)?;
            active.name = Set(name);
        }
        if let Some(year) = patch.year {
            validation::validate_year(year, self.clock.current_year())?;
            active.year = Set(year);
        }
        if let Some(description) = patch.description {
            active.description = Set(description);
        }
        match patch.category {
            Some(Some(slug)) => {
                active.category_id = Set(Some(self.category_by_slug(&slug).await?.id));
            }
            Some(None) => active.category_id = Set(None),
            None => {}
        }

        let genre_ids = match patch.genre.as_deref() {
            Some(slugs) => {
                validation::validate_genres(slugs)?;
                Some(self.resolve_genres(slugs).await?)
            }
            None => None,
        };

        let title = self.repo.update_title(active, genre_ids.as_deref()).await?;
        metrics::record_mutation("title", "update");
        info!(title_id = title.id, "Title updated");
        self.details(title).await
    }

    /// Removes the title with all of its reviews and their comments
    pub async fn delete_title(&self, actor: Option<&User>, id: i32) -> Result<()> {
        authorize(actor, Action::Delete, Resource::Title)?;
        let title = self.title_by_id(id).await?;

        self.repo.delete_title(title.id).await?;
        metrics::record_mutation("title", "delete");
        info!(title_id = title.id, "Title deleted");
        Ok(())
    }

    async fn title_by_id(&self, id: i32) -> Result<Title> {
        self.repo
            .find_title_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("title", id))
    }

    async fn details(&self, title: Title) -> Result<TitleDetails> {
        let category = match title.category_id {
            Some(category_id) => self
                .repo
                .find_category_by_id(category_id)
                .await?
                .map(Taxon::from),
            None => None,
        };
        let genre = self
            .repo
            .title_genres(&title)
            .await?
            .into_iter()
            .map(Taxon::from)
            .collect();
        let rating = self.compute_rating(title.id).await?;

        Ok(TitleDetails {
            id: title.id,
            name: title.name,
            year: title.year,
            description: title.description,
            category,
            genre,
            rating,
        })
    }
}
