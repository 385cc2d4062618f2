use serde::{Deserialize, Serialize};

use crate::{
    entities::{actor, movie},
    error::{AppError, AppResult},
};

pub const TITLE_MAX_CHARS: usize = 255;
pub const NAME_MAX_CHARS: usize = 255;
pub const MIN_YEAR: i32 = 1895;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MovieFormat {
    Vhs,
    Dvd,
    BluRay,
    Digital,
}

impl MovieFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            MovieFormat::Vhs => "VHS",
            MovieFormat::Dvd => "DVD",
            MovieFormat::BluRay => "Blu-Ray",
            MovieFormat::Digital => "Digital",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "VHS" => Some(MovieFormat::Vhs),
            "DVD" => Some(MovieFormat::Dvd),
            "Blu-Ray" => Some(MovieFormat::BluRay),
            "Digital" => Some(MovieFormat::Digital),
            _ => None,
        }
    }
}

pub fn current_year() -> i32 {
    let today: jiff::civil::Date = jiff::Zoned::now().into();
    today.year() as i32
}

pub fn max_year() -> i32 {
    current_year() + 10
}

/// The permissive character class actor names are drawn from: any Unicode
/// letter or digit plus the punctuation that occurs in real names.
pub fn valid_name_chars(name: &str) -> bool {
    name.chars().all(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '\'' | '’' | '-'))
}

pub fn validate_title(title: &str) -> Result<String, String> {
    let title = title.trim();
    if title.is_empty() {
        return Err("title must not be empty".to_string());
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(format!("title must be at most {TITLE_MAX_CHARS} characters"));
    }
    Ok(title.to_string())
}

pub fn validate_year(year: i32) -> Result<i32, String> {
    let max = max_year();
    if year < MIN_YEAR || year > max {
        return Err(format!("release year must be between {MIN_YEAR} and {max}"));
    }
    Ok(year)
}

pub fn validate_actor_name(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("actor name must not be empty".to_string());
    }
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(format!("actor name must be at most {NAME_MAX_CHARS} characters"));
    }
    if !valid_name_chars(name) {
        return Err(format!("actor name contains invalid characters: {name}"));
    }
    Ok(name.to_string())
}

/// A create candidate that passed boundary validation: title and actor
/// names trimmed, format parsed, year in range.
#[derive(Clone, Debug)]
pub struct NewMovie {
    pub title: String,
    pub year: i32,
    pub format: MovieFormat,
    pub actors: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMovieRequest {
    pub title: String,
    pub year: i32,
    pub format: String,
    pub actors: Vec<String>,
}

impl CreateMovieRequest {
    pub fn validate(self) -> AppResult<NewMovie> {
        let title = validate_title(&self.title).map_err(AppError::InvalidInput)?;
        let year = validate_year(self.year).map_err(AppError::InvalidInput)?;
        let format = MovieFormat::parse(self.format.trim()).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "format must be one of VHS, DVD, Blu-Ray, Digital; got {}",
                self.format
            ))
        })?;

        if self.actors.is_empty() {
            return Err(AppError::InvalidInput("actors must not be empty".to_string()));
        }
        let actors = self
            .actors
            .iter()
            .map(|name| validate_actor_name(name).map_err(AppError::InvalidInput))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(NewMovie { title, year, format, actors })
    }
}

/// Validated partial update. `actors: None` leaves the association set
/// untouched; a non-empty list replaces it wholesale.
#[derive(Clone, Debug, Default)]
pub struct MovieChanges {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub format: Option<MovieFormat>,
    pub actors: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMovieRequest {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub format: Option<String>,
    pub actors: Option<Vec<String>>,
}

impl UpdateMovieRequest {
    pub fn validate(self) -> AppResult<MovieChanges> {
        let title = self
            .title
            .map(|t| validate_title(&t).map_err(AppError::InvalidInput))
            .transpose()?;
        let year = self
            .year
            .map(|y| validate_year(y).map_err(AppError::InvalidInput))
            .transpose()?;
        let format = self
            .format
            .map(|f| {
                MovieFormat::parse(f.trim()).ok_or_else(|| {
                    AppError::InvalidInput(format!(
                        "format must be one of VHS, DVD, Blu-Ray, Digital; got {f}"
                    ))
                })
            })
            .transpose()?;
        let actors = self
            .actors
            .filter(|names| !names.is_empty())
            .map(|names| {
                names
                    .iter()
                    .map(|name| validate_actor_name(name).map_err(AppError::InvalidInput))
                    .collect::<AppResult<Vec<_>>>()
            })
            .transpose()?;

        Ok(MovieChanges { title, year, format, actors })
    }
}

/// A movie row together with its resolved cast, as read back from storage.
#[derive(Clone, Debug)]
pub struct MovieWithActors {
    pub movie: movie::Model,
    pub actors: Vec<actor::Model>,
}

#[derive(Debug, Serialize)]
pub struct ActorResponse {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct MovieResponse {
    pub id: i32,
    pub title: String,
    pub year: i32,
    pub format: String,
    pub actors: Vec<ActorResponse>,
}

impl From<MovieWithActors> for MovieResponse {
    fn from(value: MovieWithActors) -> Self {
        Self {
            id: value.movie.id,
            title: value.movie.title,
            year: value.movie.year,
            format: value.movie.format,
            actors: value
                .actors
                .into_iter()
                .map(|a| ActorResponse { id: a.id, name: a.name })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListMeta {
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub data: Vec<MovieResponse>,
    pub meta: ListMeta,
}

#[derive(Debug, Serialize)]
pub struct ImportMeta {
    pub imported: usize,
    pub duplicates: usize,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub data: Vec<MovieResponse>,
    pub meta: ImportMeta,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}
