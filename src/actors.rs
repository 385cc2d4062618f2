use std::collections::{HashMap, HashSet};

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::{entities::actor, error::AppResult, text};

/// Resolves a batch of actor names to persisted rows, creating whatever is
/// missing. Lookup is by exact trimmed `name`, not by `search_name`; two
/// names differing in case map to distinct rows. Returns a map keyed by
/// trimmed name.
///
/// Generic over the connection so callers can run it inside a transaction.
pub async fn resolve_by_names<C: ConnectionTrait>(
    conn: &C,
    names: &[String],
) -> AppResult<HashMap<String, actor::Model>> {
    let mut wanted = Vec::new();
    let mut seen = HashSet::new();
    for name in names {
        let trimmed = name.trim();
        if !trimmed.is_empty() && seen.insert(trimmed.to_string()) {
            wanted.push(trimmed.to_string());
        }
    }

    if wanted.is_empty() {
        return Ok(HashMap::new());
    }

    let existing = actor::Entity::find()
        .filter(actor::Column::Name.is_in(wanted.clone()))
        .all(conn)
        .await?;

    let mut resolved: HashMap<String, actor::Model> =
        existing.into_iter().map(|a| (a.name.clone(), a)).collect();

    let missing: Vec<String> =
        wanted.into_iter().filter(|name| !resolved.contains_key(name)).collect();

    if !missing.is_empty() {
        let rows = missing
            .iter()
            .map(|name| actor::ActiveModel {
                id: Default::default(),
                name: Set(name.clone()),
                search_name: Set(text::normalize(name)),
            })
            .collect::<Vec<_>>();

        actor::Entity::insert_many(rows).exec(conn).await?;

        let created = actor::Entity::find()
            .filter(actor::Column::Name.is_in(missing))
            .all(conn)
            .await?;
        resolved.extend(created.into_iter().map(|a| (a.name.clone(), a)));
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    #[tokio::test]
    async fn creates_missing_and_reuses_existing() {
        let db = connect_in_memory().await;

        let first =
            resolve_by_names(&db, &["Іван Петренко".to_string(), "Marta".to_string()])
                .await
                .unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first["Іван Петренко"].search_name, "іван петренко");

        let second =
            resolve_by_names(&db, &[" Marta ".to_string(), "New Actor".to_string()])
                .await
                .unwrap();
        assert_eq!(second["Marta"].id, first["Marta"].id);
        assert_ne!(second["New Actor"].id, first["Marta"].id);
    }

    #[tokio::test]
    async fn trims_and_collapses_repeats() {
        let db = connect_in_memory().await;

        let resolved = resolve_by_names(
            &db,
            &["Marta".to_string(), " Marta".to_string(), "Marta ".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[tokio::test]
    async fn resolution_is_case_sensitive() {
        let db = connect_in_memory().await;

        let resolved =
            resolve_by_names(&db, &["John".to_string(), "JOHN".to_string()]).await.unwrap();
        assert_eq!(resolved.len(), 2);
        assert_ne!(resolved["John"].id, resolved["JOHN"].id);
    }
}
