use std::collections::{HashMap, HashSet};

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    ModelTrait, PaginatorTrait, QueryFilter, Set, TransactionTrait,
};

use crate::{
    actors, dedup,
    entities::{actor, movie, movie_actor},
    error::{AppError, AppResult},
    models::{MovieChanges, MovieWithActors, NewMovie},
    text,
};

/// Repository for movies and their cast associations. Every multi-row
/// write runs inside one transaction; a failure at any step rolls the
/// whole write back.
#[derive(Clone)]
pub struct MovieStore {
    db: DatabaseConnection,
}

#[derive(Debug)]
pub struct BulkOutcome {
    pub created: Vec<MovieWithActors>,
    pub total_after: u64,
    pub skipped: usize,
}

impl MovieStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: NewMovie) -> AppResult<MovieWithActors> {
        if dedup::is_duplicate(
            &self.db,
            &input.title,
            input.year,
            input.format.as_str(),
            &input.actors,
        )
        .await?
        {
            return Err(AppError::MovieAlreadyExists);
        }

        let txn = self.db.begin().await?;

        let resolved = actors::resolve_by_names(&txn, &input.actors).await?;
        let movie_id = insert_movie_with_cast(&txn, &input, &resolved).await?;
        let created = load_with_actors(&txn, movie_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("created movie {movie_id} not readable"))?;

        txn.commit().await?;

        Ok(created)
    }

    pub async fn get(&self, id: i32) -> AppResult<Option<MovieWithActors>> {
        load_with_actors(&self.db, id).await
    }

    /// Applies a partial update. Returns `None` without writing when the id
    /// does not exist. `search_title` is re-derived whenever the title
    /// changes; the cast is replaced only when a new list is supplied.
    pub async fn update(&self, id: i32, changes: MovieChanges) -> AppResult<Option<MovieWithActors>> {
        let Some(existing) = movie::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let txn = self.db.begin().await?;

        let has_field_changes =
            changes.title.is_some() || changes.year.is_some() || changes.format.is_some();
        if has_field_changes {
            let mut active: movie::ActiveModel = existing.into();
            if let Some(title) = changes.title {
                active.search_title = Set(text::normalize(&title));
                active.title = Set(title);
            }
            if let Some(year) = changes.year {
                active.year = Set(year);
            }
            if let Some(format) = changes.format {
                active.format = Set(format.as_str().to_string());
            }
            active.update(&txn).await?;
        }

        if let Some(names) = changes.actors {
            movie_actor::Entity::delete_many()
                .filter(movie_actor::Column::MovieId.eq(id))
                .exec(&txn)
                .await?;

            let resolved = actors::resolve_by_names(&txn, &names).await?;
            let rows = association_rows(id, &names, &resolved)?;
            if !rows.is_empty() {
                movie_actor::Entity::insert_many(rows).exec(&txn).await?;
            }
        }

        let updated = load_with_actors(&txn, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("updated movie {id} not readable"))?;

        txn.commit().await?;

        Ok(Some(updated))
    }

    /// Removes a movie; association rows cascade, actor rows stay. Returns
    /// whether a row was actually deleted.
    pub async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = movie::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    /// Bulk create. Duplicates of already-persisted movies are filtered out
    /// (and counted) before the transaction starts, so only genuinely new
    /// records reach the all-or-nothing insert. Actor names are resolved in
    /// one pass across the whole surviving batch.
    pub async fn create_many(&self, records: Vec<NewMovie>) -> AppResult<BulkOutcome> {
        let (kept, skipped) = dedup::filter_duplicates(&self.db, records).await?;

        let txn = self.db.begin().await?;

        let union: Vec<String> =
            kept.iter().flat_map(|record| record.actors.iter().cloned()).collect();
        let resolved = actors::resolve_by_names(&txn, &union).await?;

        let mut created_ids = Vec::with_capacity(kept.len());
        let mut assoc_rows = Vec::new();
        for record in &kept {
            let movie_id = insert_movie_row(&txn, record).await?;
            assoc_rows.extend(association_rows(movie_id, &record.actors, &resolved)?);
            created_ids.push(movie_id);
        }

        if !assoc_rows.is_empty() {
            movie_actor::Entity::insert_many(assoc_rows).exec(&txn).await?;
        }

        let created = load_many_with_actors(&txn, &created_ids).await?;

        txn.commit().await?;

        let total_after = movie::Entity::find().count(&self.db).await?;

        Ok(BulkOutcome { created, total_after, skipped })
    }
}

async fn insert_movie_row<C: ConnectionTrait>(conn: &C, input: &NewMovie) -> AppResult<i32> {
    let inserted = movie::ActiveModel {
        id: Default::default(),
        title: Set(input.title.clone()),
        search_title: Set(text::normalize(&input.title)),
        year: Set(input.year),
        format: Set(input.format.as_str().to_string()),
    }
    .insert(conn)
    .await?;
    Ok(inserted.id)
}

async fn insert_movie_with_cast<C: ConnectionTrait>(
    conn: &C,
    input: &NewMovie,
    resolved: &HashMap<String, actor::Model>,
) -> AppResult<i32> {
    let movie_id = insert_movie_row(conn, input).await?;
    let rows = association_rows(movie_id, &input.actors, resolved)?;
    if !rows.is_empty() {
        movie_actor::Entity::insert_many(rows).exec(conn).await?;
    }
    Ok(movie_id)
}

fn association_rows(
    movie_id: i32,
    names: &[String],
    resolved: &HashMap<String, actor::Model>,
) -> AppResult<Vec<movie_actor::ActiveModel>> {
    let mut rows = Vec::new();
    let mut seen = HashSet::new();
    for name in names {
        let actor = resolved
            .get(name.trim())
            .ok_or_else(|| anyhow::anyhow!("actor {name:?} missing from resolution batch"))?;
        if seen.insert(actor.id) {
            rows.push(movie_actor::ActiveModel {
                movie_id: Set(movie_id),
                actor_id: Set(actor.id),
            });
        }
    }
    Ok(rows)
}

pub(crate) async fn load_with_actors<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> AppResult<Option<MovieWithActors>> {
    let Some(movie) = movie::Entity::find_by_id(id).one(conn).await? else {
        return Ok(None);
    };
    let actors = movie.find_related(actor::Entity).all(conn).await?;
    Ok(Some(MovieWithActors { movie, actors }))
}

/// Loads the given movies with their casts, preserving the id order passed
/// in.
pub(crate) async fn load_many_with_actors<C: ConnectionTrait>(
    conn: &C,
    ids: &[i32],
) -> AppResult<Vec<MovieWithActors>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = movie::Entity::find()
        .filter(movie::Column::Id.is_in(ids.iter().copied()))
        .find_with_related(actor::Entity)
        .all(conn)
        .await?;

    let mut by_id: HashMap<i32, MovieWithActors> = rows
        .into_iter()
        .map(|(movie, actors)| (movie.id, MovieWithActors { movie, actors }))
        .collect();

    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::connect_in_memory, models::MovieFormat};

    fn record(title: &str, year: i32, format: MovieFormat, actors: &[&str]) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            year,
            format,
            actors: actors.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn create_persists_movie_with_cast_and_search_title() {
        let db = connect_in_memory().await;
        let store = MovieStore::new(db);

        let created = store
            .create(record("Загін самогубців", 2016, MovieFormat::BluRay, &["Іван Петренко"]))
            .await
            .unwrap();

        assert_eq!(created.movie.search_title, "загін самогубців");
        assert_eq!(created.movie.format, "Blu-Ray");
        assert_eq!(created.actors.len(), 1);
        assert_eq!(created.actors[0].name, "Іван Петренко");
    }

    #[tokio::test]
    async fn create_rejects_equivalent_cast_regardless_of_order_case_whitespace() {
        let db = connect_in_memory().await;
        let store = MovieStore::new(db);

        store
            .create(record("А-тест", 2011, MovieFormat::BluRay, &["Іван Петренко", "Marta"]))
            .await
            .unwrap();

        let err = store
            .create(record("А-тест", 2011, MovieFormat::BluRay, &[" marta ", "іван петренко"]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MovieAlreadyExists));
    }

    #[tokio::test]
    async fn create_allows_same_title_with_different_year_format_or_cast() {
        let db = connect_in_memory().await;
        let store = MovieStore::new(db);

        store.create(record("А-тест", 2011, MovieFormat::BluRay, &["Marta"])).await.unwrap();

        store.create(record("А-тест", 2012, MovieFormat::BluRay, &["Marta"])).await.unwrap();
        store.create(record("А-тест", 2011, MovieFormat::Dvd, &["Marta"])).await.unwrap();
        store
            .create(record("А-тест", 2011, MovieFormat::BluRay, &["Marta", "Іван"]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn shared_actor_rows_are_reused_across_movies() {
        let db = connect_in_memory().await;
        let store = MovieStore::new(db.clone());

        let first =
            store.create(record("First", 2000, MovieFormat::Dvd, &["Marta"])).await.unwrap();
        let second =
            store.create(record("Second", 2001, MovieFormat::Dvd, &["Marta"])).await.unwrap();

        assert_eq!(first.actors[0].id, second.actors[0].id);
        assert_eq!(actor::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_rederives_search_title_and_preserves_cast_when_actors_absent() {
        let db = connect_in_memory().await;
        let store = MovieStore::new(db);

        let created =
            store.create(record("Old Title", 1999, MovieFormat::Vhs, &["Marta"])).await.unwrap();

        let changes = MovieChanges {
            title: Some("НОВА НАЗВА".to_string()),
            year: Some(2001),
            ..Default::default()
        };
        let updated = store.update(created.movie.id, changes).await.unwrap().unwrap();

        assert_eq!(updated.movie.title, "НОВА НАЗВА");
        assert_eq!(updated.movie.search_title, "нова назва");
        assert_eq!(updated.movie.year, 2001);
        assert_eq!(updated.actors.len(), 1);
        assert_eq!(updated.actors[0].name, "Marta");
    }

    #[tokio::test]
    async fn update_replaces_cast_when_list_supplied() {
        let db = connect_in_memory().await;
        let store = MovieStore::new(db);

        let created =
            store.create(record("Film", 2005, MovieFormat::Dvd, &["Old Actor"])).await.unwrap();

        let changes = MovieChanges {
            actors: Some(vec!["New One".to_string(), "New Two".to_string()]),
            ..Default::default()
        };
        let updated = store.update(created.movie.id, changes).await.unwrap().unwrap();

        let mut names: Vec<_> = updated.actors.iter().map(|a| a.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["New One".to_string(), "New Two".to_string()]);
    }

    #[tokio::test]
    async fn update_missing_id_returns_none() {
        let db = connect_in_memory().await;
        let store = MovieStore::new(db);

        let changes = MovieChanges { year: Some(2000), ..Default::default() };
        assert!(store.update(4242, changes).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_cascades_associations_and_keeps_actors() {
        let db = connect_in_memory().await;
        let store = MovieStore::new(db.clone());

        let created =
            store.create(record("Doomed", 2010, MovieFormat::Digital, &["Survivor"])).await.unwrap();

        assert!(store.delete(created.movie.id).await.unwrap());
        assert!(!store.delete(created.movie.id).await.unwrap());

        assert_eq!(movie_actor::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(actor::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn create_many_skips_persisted_duplicates_and_counts() {
        let db = connect_in_memory().await;
        let store = MovieStore::new(db);

        store
            .create(record("Existing", 1990, MovieFormat::Vhs, &["Marta", "Іван Петренко"]))
            .await
            .unwrap();

        let outcome = store
            .create_many(vec![
                record("Existing", 1990, MovieFormat::Vhs, &["іван петренко", " marta "]),
                record("Fresh", 1991, MovieFormat::Vhs, &["Marta"]),
            ])
            .await
            .unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.created[0].movie.title, "Fresh");
        assert_eq!(outcome.total_after, 2);
    }

    #[tokio::test]
    async fn create_many_resolves_shared_cast_once() {
        let db = connect_in_memory().await;
        let store = MovieStore::new(db.clone());

        let outcome = store
            .create_many(vec![
                record("One", 2001, MovieFormat::Dvd, &["Shared", "Only One"]),
                record("Two", 2002, MovieFormat::Dvd, &["Shared"]),
            ])
            .await
            .unwrap();

        assert_eq!(outcome.created.len(), 2);
        assert_eq!(actor::Entity::find().count(&db).await.unwrap(), 2);
    }
}
