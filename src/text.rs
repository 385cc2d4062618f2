use icu_collator::{CaseFirst, Collator, CollatorError, CollatorOptions, Numeric, Strength};
use icu_locid::locale;

/// Case fold for comparison keys. Unicode-aware so Cyrillic folds the same
/// way Latin does; trimming is left to call sites that need it.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
}

/// Collator used for title ordering. SQLite's built-in collations order
/// Cyrillic case pairs incorrectly, so title sort runs in memory through
/// this instead.
///
/// Tertiary strength keeps accents significant, upper-first breaks ties
/// between case pairs, and numeric ordering compares embedded digit runs
/// by value.
pub fn title_collator() -> Result<Collator, CollatorError> {
    let mut options = CollatorOptions::new();
    options.strength = Some(Strength::Tertiary);
    options.case_first = Some(CaseFirst::UpperFirst);
    options.numeric = Some(Numeric::On);
    Collator::try_new(&locale!("uk").into(), options)
}
