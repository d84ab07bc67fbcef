//! Book operations: validate first, then hand off to the repository.

use std::sync::Arc;

use thiserror::Error;

use bookshelf_http::error::AppError;
use bookshelf_kernel::{FieldErrors, PaginationMetadata};

use super::models::{Book, CreateBook, ListParams, UpdateBook};
use super::repository::{BookRepository, RepositoryError};
use super::validation::{parse_list_params, validate_book, validate_search};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(errors) => AppError::failed_validation(errors),
            ServiceError::Repository(RepositoryError::NotFound) => AppError::not_found(),
            ServiceError::Repository(RepositoryError::EditConflict) => AppError::edit_conflict(),
            ServiceError::Repository(RepositoryError::Store(err)) => {
                AppError::Internal(anyhow::Error::new(err).context("book store operation failed"))
            }
        }
    }
}

fn check(errors: FieldErrors) -> Result<(), ServiceError> {
    errors.into_result().map_err(ServiceError::Validation)
}

#[derive(Clone)]
pub struct BookService {
    repository: Arc<dyn BookRepository>,
}

impl BookService {
    pub fn new(repository: Arc<dyn BookRepository>) -> Self {
        Self { repository }
    }

    pub async fn create(&self, input: CreateBook) -> Result<Book, ServiceError> {
        let mut book = Book::draft(input);
        check(validate_book(&book))?;

        self.repository.insert(&mut book).await?;
        tracing::info!(book_id = book.id, "book created");
        Ok(book)
    }

    pub async fn get(&self, id: i64) -> Result<Book, ServiceError> {
        Ok(self.repository.get(id).await?)
    }

    /// Apply a partial update on top of the stored book.
    ///
    /// A `version` in the input that differs from the stored one is an edit
    /// conflict; so is a concurrent write landing between read and update.
    pub async fn update(&self, id: i64, input: UpdateBook) -> Result<Book, ServiceError> {
        let mut book = self.repository.get(id).await?;

        if let Some(expected) = input.version {
            if expected != book.version {
                tracing::debug!(
                    book_id = id,
                    expected,
                    stored = book.version,
                    "stale version on update"
                );
                return Err(RepositoryError::EditConflict.into());
            }
        }

        book.apply(input);
        check(validate_book(&book))?;

        self.repository.update(&mut book).await?;
        tracing::info!(book_id = book.id, version = book.version, "book updated");
        Ok(book)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        self.repository.delete(id).await?;
        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }

    pub async fn list(
        &self,
        params: ListParams,
    ) -> Result<(Vec<Book>, PaginationMetadata), ServiceError> {
        let filter = parse_list_params(params).map_err(ServiceError::Validation)?;
        Ok(self
            .repository
            .list(&filter.title, &filter.genres, &filter.filters)
            .await?)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Book>, ServiceError> {
        let query = query.trim();
        check(validate_search(query))?;
        Ok(self.repository.search(query).await?)
    }
}
