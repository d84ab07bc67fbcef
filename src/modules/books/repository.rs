//! Record access for books.
//!
//! Every statement is parameterized except the `ORDER BY` body, which is
//! assembled from a resolved [`SortOrder`] and never from request text.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use thiserror::Error;

use bookshelf_kernel::{Filters, PaginationMetadata, SortOrder};

use super::models::{Book, BookSort};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    /// The row changed (or vanished) since the caller read its version.
    #[error("edit conflict")]
    EditConflict,

    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

/// Persistence operations for books.
///
/// Implementations hold no mutable state of their own; concurrent updates are
/// arbitrated by the store through the version-conditioned update.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Persist a validated book and fill in `id`, `created_at` and `version`.
    async fn insert(&self, book: &mut Book) -> Result<(), RepositoryError>;

    async fn get(&self, id: i64) -> Result<Book, RepositoryError>;

    /// Write `book` if its `version` is still current, then bump
    /// `book.version` to the stored value.
    async fn update(&self, book: &mut Book) -> Result<(), RepositoryError>;

    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;

    /// Page of books matching `title` (case-insensitive, exact) and containing
    /// every genre in `genres`; empty terms match everything.
    async fn list(
        &self,
        title: &str,
        genres: &[String],
        filters: &Filters,
    ) -> Result<(Vec<Book>, PaginationMetadata), RepositoryError>;

    /// Full-text match on title ordered by id; an empty query returns all books.
    async fn search(&self, query: &str) -> Result<Vec<Book>, RepositoryError>;
}

const INSERT_SQL: &str = r#"
    INSERT INTO books (title, published, pages, genres)
    VALUES ($1, $2, $3, $4)
    RETURNING id, created_at, version"#;

const GET_SQL: &str = r#"
    SELECT id, created_at, title, published, pages, genres, version
    FROM books
    WHERE id = $1"#;

const UPDATE_SQL: &str = r#"
    UPDATE books
    SET title = $1, published = $2, pages = $3, genres = $4, version = version + 1
    WHERE id = $5 AND version = $6
    RETURNING version"#;

const DELETE_SQL: &str = "DELETE FROM books WHERE id = $1";

const LIST_WHERE: &str = r#"
    WHERE (lower(title) = lower($1) OR $1 = '')
    AND (genres @> $2 OR $2 = '{}')"#;

const SEARCH_SQL: &str = r#"
    SELECT id, created_at, title, published, pages, genres, version
    FROM books
    WHERE (to_tsvector('simple', title) @@ plainto_tsquery('simple', $1) OR $1 = '')
    ORDER BY id ASC"#;

/// Listing query with a windowed total so one round trip yields both the page
/// and the full match count.
pub fn list_sql(order: &SortOrder<BookSort>) -> String {
    format!(
        r#"
    SELECT count(*) OVER() AS total, id, created_at, title, published, pages, genres, version
    FROM books{LIST_WHERE}
    ORDER BY {}
    LIMIT $3 OFFSET $4"#,
        order.order_by()
    )
}

fn count_sql() -> String {
    format!("SELECT count(*) FROM books{LIST_WHERE}")
}

#[derive(FromRow)]
struct CountedBook {
    total: i64,
    #[sqlx(flatten)]
    book: Book,
}

#[derive(Clone)]
pub struct PgBookRepository {
    pool: PgPool,
}

impl PgBookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for PgBookRepository {
    async fn insert(&self, book: &mut Book) -> Result<(), RepositoryError> {
        let (id, created_at, version): (i64, time::OffsetDateTime, i32) =
            sqlx::query_as(INSERT_SQL)
                .bind(&book.title)
                .bind(book.published)
                .bind(book.pages)
                .bind(&book.genres)
                .fetch_one(&self.pool)
                .await?;

        book.id = id;
        book.created_at = created_at;
        book.version = version;
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Book, RepositoryError> {
        if id < 1 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query_as::<_, Book>(GET_SQL)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => RepositoryError::NotFound,
                other => RepositoryError::Store(other),
            })
    }

    async fn update(&self, book: &mut Book) -> Result<(), RepositoryError> {
        let version: Option<i32> = sqlx::query_scalar(UPDATE_SQL)
            .bind(&book.title)
            .bind(book.published)
            .bind(book.pages)
            .bind(&book.genres)
            .bind(book.id)
            .bind(book.version)
            .fetch_optional(&self.pool)
            .await?;

        match version {
            Some(version) => {
                book.version = version;
                Ok(())
            }
            None => Err(RepositoryError::EditConflict),
        }
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        if id < 1 {
            return Err(RepositoryError::NotFound);
        }

        let result = sqlx::query(DELETE_SQL).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list(
        &self,
        title: &str,
        genres: &[String],
        filters: &Filters,
    ) -> Result<(Vec<Book>, PaginationMetadata), RepositoryError> {
        let order = filters.sort_order::<BookSort>();
        let sql = list_sql(&order);

        let rows: Vec<CountedBook> = sqlx::query_as(&sql)
            .bind(title)
            .bind(genres)
            .bind(filters.limit())
            .bind(filters.offset())
            .fetch_all(&self.pool)
            .await?;

        let total = match rows.first() {
            Some(row) => row.total,
            // Past the last page the window yields no rows to read the total from.
            None if filters.offset() > 0 => {
                let sql = count_sql();
                sqlx::query_scalar::<_, i64>(&sql)
                    .bind(title)
                    .bind(genres)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => 0,
        };

        let books = rows.into_iter().map(|row| row.book).collect();
        let metadata = PaginationMetadata::calculate(total, filters.page, filters.size);
        Ok((books, metadata))
    }

    async fn search(&self, query: &str) -> Result<Vec<Book>, RepositoryError> {
        let books = sqlx::query_as::<_, Book>(SEARCH_SQL)
            .bind(query)
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }
}
