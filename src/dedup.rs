use std::collections::{HashMap, HashSet};

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::{
    entities::{actor, movie},
    error::AppResult,
    models::NewMovie,
    text,
};

/// Comparison key for a movie's cast: trimmed, case-folded, repeats
/// collapsed. Order never matters for duplicate checks.
pub fn actor_name_set(names: &[String]) -> HashSet<String> {
    names
        .iter()
        .map(|name| text::normalize(name.trim()))
        .filter(|name| !name.is_empty())
        .collect()
}

/// Whether a movie with the same exact (title, year, format) and an
/// equivalent cast already exists. Title and format compare exactly;
/// only the cast comparison is normalized.
pub async fn is_duplicate<C: ConnectionTrait>(
    conn: &C,
    title: &str,
    year: i32,
    format: &str,
    actor_names: &[String],
) -> AppResult<bool> {
    let candidate = actor_name_set(actor_names);
    let existing = existing_casts_for_key(conn, title.trim(), year, format.trim()).await?;
    Ok(existing.iter().any(|cast| *cast == candidate))
}

/// Drops candidates that duplicate an already-persisted movie, preserving
/// input order. Candidates are grouped by (title, year, format) so storage
/// is queried once per distinct key, not once per record. Returns the
/// survivors and the number removed.
pub async fn filter_duplicates<C: ConnectionTrait>(
    conn: &C,
    candidates: Vec<NewMovie>,
) -> AppResult<(Vec<NewMovie>, usize)> {
    let mut existing_by_key: HashMap<(String, i32, String), Vec<HashSet<String>>> =
        HashMap::new();

    for candidate in &candidates {
        let key =
            (candidate.title.clone(), candidate.year, candidate.format.as_str().to_string());
        if !existing_by_key.contains_key(&key) {
            let casts = existing_casts_for_key(conn, &key.0, key.1, &key.2).await?;
            existing_by_key.insert(key, casts);
        }
    }

    let mut kept = Vec::new();
    let mut skipped = 0;
    for candidate in candidates {
        let key =
            (candidate.title.clone(), candidate.year, candidate.format.as_str().to_string());
        let cast = actor_name_set(&candidate.actors);
        if existing_by_key[&key].iter().any(|existing| *existing == cast) {
            skipped += 1;
        } else {
            kept.push(candidate);
        }
    }

    Ok((kept, skipped))
}

async fn existing_casts_for_key<C: ConnectionTrait>(
    conn: &C,
    title: &str,
    year: i32,
    format: &str,
) -> AppResult<Vec<HashSet<String>>> {
    let rows = movie::Entity::find()
        .filter(movie::Column::Title.eq(title))
        .filter(movie::Column::Year.eq(year))
        .filter(movie::Column::Format.eq(format))
        .find_with_related(actor::Entity)
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(_, actors)| {
            actors.iter().map(|a| text::normalize(a.name.trim())).collect::<HashSet<_>>()
        })
        .collect())
}
