use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use bookshelf_kernel::{Filters, PaginationMetadata, SortColumn};

/// A catalogued book as stored in the `books` table.
///
/// `id`, `created_at` and `version` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Book {
    pub id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub title: String,
    pub published: i32,
    pub pages: i32,
    pub genres: Vec<String>,
    /// Optimistic-concurrency token, starts at 1
    pub version: i32,
}

impl Book {
    /// An unsaved book; store-assigned fields are zeroed until insert.
    pub fn draft(input: CreateBook) -> Self {
        Self {
            id: 0,
            created_at: OffsetDateTime::UNIX_EPOCH,
            title: input.title,
            published: input.published,
            pages: input.pages,
            genres: input.genres,
            version: 0,
        }
    }

    /// Overwrite the fields present in `input`.
    pub fn apply(&mut self, input: UpdateBook) {
        if let Some(title) = input.title {
            self.title = title;
        }
        if let Some(published) = input.published {
            self.published = published;
        }
        if let Some(pages) = input.pages {
            self.pages = pages;
        }
        if let Some(genres) = input.genres {
            self.genres = genres;
        }
    }
}

/// Request body for creating a book. Missing fields are zero-valued and
/// rejected by validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateBook {
    pub title: String,
    pub published: i32,
    pub pages: i32,
    pub genres: Vec<String>,
}

/// Request body for a partial update.
///
/// `version`, when sent, must match the stored version.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateBook {
    pub title: Option<String>,
    pub published: Option<i32>,
    pub pages: Option<i32>,
    pub genres: Option<Vec<String>>,
    pub version: Option<i32>,
}

/// Raw `GET /books` query string; parsed by
/// [`super::validation::parse_list_params`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub title: Option<String>,
    pub genres: Option<String>,
    pub page: Option<String>,
    pub size: Option<String>,
    pub sort: Option<String>,
}

/// Validated listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFilter {
    pub title: String,
    pub genres: Vec<String>,
    pub filters: Filters,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// Columns a book listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSort {
    Id,
    Title,
    Published,
    Pages,
}

impl SortColumn for BookSort {
    const ALL: &'static [Self] = &[
        BookSort::Id,
        BookSort::Title,
        BookSort::Published,
        BookSort::Pages,
    ];
    const TIEBREAK: Self = BookSort::Id;

    fn column(self) -> &'static str {
        match self {
            BookSort::Id => "id",
            BookSort::Title => "title",
            BookSort::Published => "published",
            BookSort::Pages => "pages",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookEnvelope {
    pub book: Book,
}

#[derive(Debug, Serialize)]
pub struct BookListEnvelope {
    pub books: Vec<Book>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PaginationMetadata>,
}

#[derive(Debug, Serialize)]
pub struct MessageEnvelope {
    pub message: &'static str,
}
