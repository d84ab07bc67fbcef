//! Field rules for books and listing requests.

use time::OffsetDateTime;

use bookshelf_kernel::{Check, FieldErrors, Filters, RuleSet};

use super::models::{Book, BookFilter, BookSort, ListParams};

pub const TITLE_MAX_CHARS: usize = 56;
pub const MIN_PUBLISHED_YEAR: i32 = 1430;
pub const MAX_GENRES: usize = 5;
pub const SEARCH_MAX_CHARS: usize = 50;

/// Rule table for a book, with the upper publication bound at `current_year`.
pub fn book_rules(current_year: i32) -> RuleSet<Book> {
    RuleSet::new()
        .field(
            "title",
            vec![
                Check::required_str(|b: &Book| b.title.as_str()),
                Check::max_chars(|b: &Book| b.title.as_str(), TITLE_MAX_CHARS),
            ],
        )
        .field(
            "published",
            vec![
                Check::new(|b: &Book| b.published != 0, "must be provided"),
                Check::new(
                    move |b: &Book| (MIN_PUBLISHED_YEAR..=current_year).contains(&b.published),
                    format!(
                        "publication date cannot exceed the range: {MIN_PUBLISHED_YEAR}-{current_year}"
                    ),
                ),
            ],
        )
        .field(
            "pages",
            vec![
                Check::new(|b: &Book| b.pages != 0, "must be provided"),
                Check::new(|b: &Book| b.pages > 0, "must be greater than zero"),
            ],
        )
        .field(
            "genres",
            vec![
                Check::new(|b: &Book| !b.genres.is_empty(), "must be provided"),
                Check::new(
                    |b: &Book| b.genres.len() <= MAX_GENRES,
                    format!("must not exceed {MAX_GENRES} items"),
                ),
                Check::unique(
                    |b: &Book| b.genres.as_slice(),
                    "cannot contain duplicate genres",
                ),
            ],
        )
}

/// Validate against the calendar year at the time of the call.
pub fn validate_book(book: &Book) -> FieldErrors {
    book_rules(OffsetDateTime::now_utc().year()).validate(book)
}

/// Turn raw query parameters into a validated [`BookFilter`].
///
/// Integers that fail to parse are reported as "must be an integer" and take
/// precedence over range checks on the same field.
pub fn parse_list_params(params: ListParams) -> Result<BookFilter, FieldErrors> {
    let mut errors = FieldErrors::new();
    let defaults = Filters::default();

    let page = parse_int(params.page.as_deref(), "page", defaults.page, &mut errors);
    let size = parse_int(params.size.as_deref(), "size", defaults.size, &mut errors);
    let sort = params
        .sort
        .filter(|s| !s.is_empty())
        .unwrap_or(defaults.sort);

    let filters = Filters { page, size, sort };
    Filters::rules::<BookSort>().validate_into(&filters, &mut errors);
    errors.into_result()?;

    Ok(BookFilter {
        title: params.title.unwrap_or_default().trim().to_string(),
        genres: split_csv(params.genres.as_deref()),
        filters,
    })
}

pub fn validate_search(query: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if query.chars().count() > SEARCH_MAX_CHARS {
        errors.add("q", format!("above the character limit: {SEARCH_MAX_CHARS}"));
    }
    errors
}

fn parse_int(raw: Option<&str>, field: &str, default: i64, errors: &mut FieldErrors) -> i64 {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => default,
        Some(value) => value.parse().unwrap_or_else(|_| {
            errors.add(field, "must be an integer");
            default
        }),
    }
}

fn split_csv(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
