use crate::{
    error::{AppError, AppResult},
    models::{self, MovieFormat, NewMovie},
};

/// Parses a flat-text import file: records separated by one or more blank
/// lines, each record exactly four `Field: value` lines with field names
/// Title, Release Year, Format and Stars in any order (case-insensitive).
/// The first structurally invalid block fails the whole file; nothing is
/// persisted by the caller in that case.
pub fn parse(text: &str) -> AppResult<Vec<NewMovie>> {
    split_blocks(text).into_iter().map(|block| parse_block(&block)).collect()
}

fn split_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn parse_block(lines: &[&str]) -> AppResult<NewMovie> {
    if lines.len() != 4 {
        return Err(AppError::InvalidFileContent(format!(
            "movie record must have exactly 4 fields, found {}",
            lines.len()
        )));
    }

    let mut title = None;
    let mut year = None;
    let mut format = None;
    let mut stars = None;

    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_lowercase().as_str() {
            "title" if title.is_none() => title = Some(value.to_string()),
            "release year" if year.is_none() => year = Some(value.to_string()),
            "format" if format.is_none() => format = Some(value.to_string()),
            "stars" if stars.is_none() => stars = Some(value.to_string()),
            _ => {},
        }
    }

    match (title, year, format, stars) {
        (Some(title), Some(year), Some(format), Some(stars)) => {
            build_record(title, year, format, stars)
        },
        (title, year, format, stars) => {
            let mut missing = Vec::new();
            if title.is_none() {
                missing.push("Title");
            }
            if year.is_none() {
                missing.push("Release Year");
            }
            if format.is_none() {
                missing.push("Format");
            }
            if stars.is_none() {
                missing.push("Stars");
            }
            Err(AppError::MissingRequiredFields(missing.join(", ")))
        },
    }
}

fn build_record(
    title: String,
    year: String,
    format: String,
    stars: String,
) -> AppResult<NewMovie> {
    let title = models::validate_title(&title).map_err(AppError::InvalidFileContent)?;

    let year: i32 = year.parse().map_err(|_| {
        AppError::InvalidInput(format!("release year must be an integer; got {year:?}"))
    })?;
    let year = models::validate_year(year).map_err(AppError::InvalidInput)?;

    let format = MovieFormat::parse(&format).ok_or_else(|| {
        AppError::InvalidFileContent(format!("invalid format value: {format:?}"))
    })?;

    let actors = stars
        .split(',')
        .map(|name| models::validate_actor_name(name).map_err(AppError::InvalidFileContent))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(NewMovie { title, year, format, actors })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Title: Blazing Saddles\n\
                          Release Year: 1974\n\
                          Format: VHS\n\
                          Stars: Mel Brooks, Clevon Little, Harvey Korman\n";

    #[test]
    fn parses_single_record_with_comma_split_trimmed_stars() {
        let records = parse(SAMPLE).unwrap();
        assert_eq!(records.len(), 1);
        let movie = &records[0];
        assert_eq!(movie.title, "Blazing Saddles");
        assert_eq!(movie.year, 1974);
        assert_eq!(movie.format, MovieFormat::Vhs);
        assert_eq!(
            movie.actors,
            vec![
                "Mel Brooks".to_string(),
                "Clevon Little".to_string(),
                "Harvey Korman".to_string()
            ]
        );
    }

    #[test]
    fn splits_records_on_multiple_blank_lines_and_crlf() {
        let text = "Title: One\r\nRelease Year: 2001\r\nFormat: DVD\r\nStars: A Star\r\n\r\n\r\n\
                    Title: Two\r\nRelease Year: 2002\r\nFormat: DVD\r\nStars: B Star\r\n";
        let records = parse(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "One");
        assert_eq!(records[1].title, "Two");
    }

    #[test]
    fn field_names_are_case_insensitive_and_order_free() {
        let text = "stars: Marta\nFORMAT: Digital\nrelease year: 2010\ntitle: Реверс\n";
        let records = parse(text).unwrap();
        assert_eq!(records[0].title, "Реверс");
        assert_eq!(records[0].format, MovieFormat::Digital);
    }

    #[test]
    fn wrong_line_count_is_invalid_file_content() {
        let text = "Title: Broken\nRelease Year: 2001\nFormat: DVD\n";
        assert!(matches!(parse(text), Err(AppError::InvalidFileContent(_))));

        let text = "Title: Broken\nRelease Year: 2001\nFormat: DVD\nStars: A\nExtra: line\n";
        assert!(matches!(parse(text), Err(AppError::InvalidFileContent(_))));
    }

    #[test]
    fn unknown_field_in_right_sized_block_reports_the_missing_one() {
        let text = "Title: Broken\nRelease Year: 2001\nDirector: Someone\nStars: A Star\n";
        match parse(text) {
            Err(AppError::MissingRequiredFields(missing)) => assert_eq!(missing, "Format"),
            other => panic!("expected MissingRequiredFields, got {other:?}"),
        }
    }

    #[test]
    fn line_without_colon_counts_as_missing_field() {
        let text = "Title: Broken\nRelease Year: 2001\nFormat DVD\nStars: A Star\n";
        assert!(matches!(parse(text), Err(AppError::MissingRequiredFields(_))));
    }

    #[test]
    fn invalid_format_value_is_invalid_file_content() {
        let text = "Title: Broken\nRelease Year: 2001\nFormat: Betamax\nStars: A Star\n";
        assert!(matches!(parse(text), Err(AppError::InvalidFileContent(_))));
    }

    #[test]
    fn empty_title_is_invalid_file_content() {
        let text = "Title:   \nRelease Year: 2001\nFormat: DVD\nStars: A Star\n";
        assert!(matches!(parse(text), Err(AppError::InvalidFileContent(_))));
    }

    #[test]
    fn out_of_range_or_non_integer_year_is_invalid_input() {
        let text = "Title: Early\nRelease Year: 1800\nFormat: DVD\nStars: A Star\n";
        assert!(matches!(parse(text), Err(AppError::InvalidInput(_))));

        let text = "Title: Weird\nRelease Year: soon\nFormat: DVD\nStars: A Star\n";
        assert!(matches!(parse(text), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn empty_star_entry_is_invalid_file_content() {
        let text = "Title: Film\nRelease Year: 2001\nFormat: DVD\nStars: A Star,,B Star\n";
        assert!(matches!(parse(text), Err(AppError::InvalidFileContent(_))));
    }

    #[test]
    fn first_bad_block_fails_the_whole_file() {
        let text = "Title: Good\nRelease Year: 2001\nFormat: DVD\nStars: A Star\n\n\
                    Title: Bad\nRelease Year: 2002\nFormat: Betamax\nStars: B Star\n";
        assert!(parse(text).is_err());
    }

    #[test]
    fn empty_file_parses_to_no_records() {
        assert!(parse("\n\n").unwrap().is_empty());
    }

    #[tokio::test]
    async fn parsed_file_flows_through_bulk_create() {
        let db = crate::db::connect_in_memory().await;
        let store = crate::movies::MovieStore::new(db);

        let outcome = store.create_many(parse(SAMPLE).unwrap()).await.unwrap();
        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(outcome.total_after, 1);

        let mut names: Vec<_> =
            outcome.created[0].actors.iter().map(|a| a.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Clevon Little", "Harvey Korman", "Mel Brooks"]);

        // A second run of the same file only counts duplicates.
        let again = store.create_many(parse(SAMPLE).unwrap()).await.unwrap();
        assert_eq!(again.created.len(), 0);
        assert_eq!(again.skipped, 1);
        assert_eq!(again.total_after, 1);
    }
}
