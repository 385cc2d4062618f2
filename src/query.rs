use std::sync::Arc;

use icu_collator::Collator;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
    sea_query::{Expr, LikeExpr, Query, SelectStatement},
};
use serde::Deserialize;

use crate::{
    entities::{actor, movie, movie_actor},
    error::{AppError, AppResult},
    models::MovieWithActors,
    movies,
    text,
};

#[derive(Clone, Debug, Default)]
pub struct MovieFilters {
    pub title: Option<String>,
    pub actor: Option<String>,
    pub search: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortField {
    Id,
    Title,
    Year,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Clone, Copy, Debug)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

#[derive(Clone, Copy, Debug)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

/// Raw listing query params as they arrive on the wire.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub title: Option<String>,
    pub actor: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl ListQuery {
    pub fn validate(self) -> AppResult<(MovieFilters, SortSpec, Page)> {
        let field = match self.sort.as_deref() {
            None => SortField::Id,
            Some("id") => SortField::Id,
            Some("title") => SortField::Title,
            Some("year") => SortField::Year,
            Some(other) => {
                return Err(AppError::InvalidInput(format!(
                    "sort must be one of id, title, year; got {other}"
                )));
            },
        };
        let order = match self.order.as_deref() {
            None => SortOrder::Asc,
            Some("ASC") => SortOrder::Asc,
            Some("DESC") => SortOrder::Desc,
            Some(other) => {
                return Err(AppError::InvalidInput(format!(
                    "order must be ASC or DESC; got {other}"
                )));
            },
        };

        let limit = self.limit.unwrap_or(20);
        if !(1..=100).contains(&limit) {
            return Err(AppError::InvalidInput("limit must be between 1 and 100".to_string()));
        }
        let offset = self.offset.unwrap_or(0);

        let non_blank = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        let filters = MovieFilters {
            title: non_blank(self.title),
            actor: non_blank(self.actor),
            search: non_blank(self.search),
        };

        Ok((filters, SortSpec { field, order }, Page { limit, offset }))
    }
}

/// Read side of the catalog. Sorting by id/year is pushed to storage;
/// sorting by title goes through the ICU collator in memory because
/// SQLite's collations mis-order Cyrillic case pairs.
#[derive(Clone)]
pub struct MovieQuery {
    db: DatabaseConnection,
    collator: Arc<Collator>,
}

impl MovieQuery {
    pub fn new(db: DatabaseConnection, collator: Arc<Collator>) -> Self {
        Self { db, collator }
    }

    /// Returns one page of matching movies plus the unpaginated total.
    pub async fn list(
        &self,
        filters: &MovieFilters,
        sort: SortSpec,
        page: Page,
    ) -> AppResult<(Vec<MovieWithActors>, u64)> {
        let cond = build_condition(filters);
        match sort.field {
            SortField::Title => self.list_title_sorted(cond, sort.order, page).await,
            SortField::Id => self.list_storage_sorted(cond, movie::Column::Id, sort.order, page).await,
            SortField::Year => {
                self.list_storage_sorted(cond, movie::Column::Year, sort.order, page).await
            },
        }
    }

    async fn list_storage_sorted(
        &self,
        cond: Condition,
        column: movie::Column,
        order: SortOrder,
        page: Page,
    ) -> AppResult<(Vec<MovieWithActors>, u64)> {
        let total = movie::Entity::find().filter(cond.clone()).count(&self.db).await?;

        let order = match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };
        // Id tie-break keeps page boundaries stable when the sort column
        // has equal values (e.g. several movies from one year).
        let rows = movie::Entity::find()
            .filter(cond)
            .order_by(column, order)
            .order_by(movie::Column::Id, Order::Asc)
            .limit(page.limit)
            .offset(page.offset)
            .all(&self.db)
            .await?;

        let ids: Vec<i32> = rows.iter().map(|m| m.id).collect();
        let items = movies::load_many_with_actors(&self.db, &ids).await?;
        Ok((items, total))
    }

    async fn list_title_sorted(
        &self,
        cond: Condition,
        order: SortOrder,
        page: Page,
    ) -> AppResult<(Vec<MovieWithActors>, u64)> {
        let mut rows = movie::Entity::find().filter(cond).all(&self.db).await?;
        let total = rows.len() as u64;

        rows.sort_by(|a, b| {
            let ord = self.collator.compare(a.title.trim(), b.title.trim());
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let ids: Vec<i32> = rows
            .iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .map(|m| m.id)
            .collect();
        let items = movies::load_many_with_actors(&self.db, &ids).await?;
        Ok((items, total))
    }
}

fn build_condition(filters: &MovieFilters) -> Condition {
    let mut cond = Condition::all();

    // `title` and `search` share one OR group; `search` itself matches
    // either the title or any cast member.
    if filters.title.is_some() || filters.search.is_some() {
        let mut title_or_search = Condition::any();
        if let Some(title) = &filters.title {
            let needle = text::normalize(title.trim());
            title_or_search = title_or_search.add(
                Expr::col((movie::Entity, movie::Column::SearchTitle))
                    .like(contains_pattern(&needle)),
            );
        }
        if let Some(search) = &filters.search {
            let needle = text::normalize(search.trim());
            title_or_search = title_or_search
                .add(
                    Expr::col((movie::Entity, movie::Column::SearchTitle))
                        .like(contains_pattern(&needle)),
                )
                .add(movie::Column::Id.in_subquery(cast_match_subquery(&needle)));
        }
        cond = cond.add(title_or_search);
    }

    if let Some(actor) = &filters.actor {
        let needle = text::normalize(actor.trim());
        cond = cond.add(movie::Column::Id.in_subquery(cast_match_subquery(&needle)));
    }

    cond
}

/// Substring match pattern with LIKE metacharacters in the needle escaped,
/// so a filter value of "%" or "_" only matches itself.
fn contains_pattern(needle: &str) -> LikeExpr {
    let escaped = needle.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    LikeExpr::new(format!("%{escaped}%")).escape('\\')
}

/// Ids of movies having at least one actor whose folded name contains the
/// needle.
fn cast_match_subquery(needle: &str) -> SelectStatement {
    Query::select()
        .column((movie_actor::Entity, movie_actor::Column::MovieId))
        .from(movie_actor::Entity)
        .inner_join(
            actor::Entity,
            Expr::col((actor::Entity, actor::Column::Id))
                .equals((movie_actor::Entity, movie_actor::Column::ActorId)),
        )
        .and_where(
            Expr::col((actor::Entity, actor::Column::SearchName)).like(contains_pattern(needle)),
        )
        .to_owned()
}
