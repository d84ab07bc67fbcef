//! In-memory stand-in for the PostgreSQL repository.
#![allow(dead_code)]

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::OffsetDateTime;

use bookshelf_app::modules::books::models::{Book, BookSort, CreateBook};
use bookshelf_app::modules::books::repository::{BookRepository, RepositoryError};
use bookshelf_app::modules::books::service::BookService;
use bookshelf_kernel::{Filters, PaginationMetadata, SortDirection};

#[derive(Default)]
struct Store {
    next_id: i64,
    books: Vec<Book>,
}

/// Mirrors the store's contract: ids from 1, version-conditioned updates,
/// listing with the same predicate and ordering rules.
#[derive(Default)]
pub struct MemoryBookRepository {
    store: Mutex<Store>,
    failing: AtomicBool,
}

impl MemoryBookRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every subsequent call fail as if the pool were exhausted.
    pub fn fail_with_store_error(&self) {
        self.failing.store(true, AtomicOrdering::SeqCst);
    }

    pub fn stored(&self, id: i64) -> Option<Book> {
        let store = self.store.lock().unwrap();
        store.books.iter().find(|b| b.id == id).cloned()
    }

    fn check_store(&self) -> Result<(), RepositoryError> {
        if self.failing.load(AtomicOrdering::SeqCst) {
            return Err(RepositoryError::Store(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

fn title_words(title: &str) -> Vec<String> {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn compare(a: &Book, b: &Book, column: BookSort) -> Ordering {
    match column {
        BookSort::Id => a.id.cmp(&b.id),
        BookSort::Title => a.title.cmp(&b.title),
        BookSort::Published => a.published.cmp(&b.published),
        BookSort::Pages => a.pages.cmp(&b.pages),
    }
}

#[async_trait]
impl BookRepository for MemoryBookRepository {
    async fn insert(&self, book: &mut Book) -> Result<(), RepositoryError> {
        self.check_store()?;
        let mut store = self.store.lock().unwrap();
        store.next_id += 1;
        book.id = store.next_id;
        book.created_at = OffsetDateTime::now_utc().replace_nanosecond(0).unwrap();
        book.version = 1;
        store.books.push(book.clone());
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Book, RepositoryError> {
        self.check_store()?;
        if id < 1 {
            return Err(RepositoryError::NotFound);
        }
        self.stored(id).ok_or(RepositoryError::NotFound)
    }

    async fn update(&self, book: &mut Book) -> Result<(), RepositoryError> {
        self.check_store()?;
        let mut store = self.store.lock().unwrap();
        let stored = store
            .books
            .iter_mut()
            .find(|b| b.id == book.id && b.version == book.version)
            .ok_or(RepositoryError::EditConflict)?;

        book.version += 1;
        *stored = book.clone();
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        self.check_store()?;
        if id < 1 {
            return Err(RepositoryError::NotFound);
        }
        let mut store = self.store.lock().unwrap();
        let before = store.books.len();
        store.books.retain(|b| b.id != id);
        if store.books.len() == before {
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
        self.check_store()?;
        let order = filters.sort_order::<BookSort>();
        let store = self.store.lock().unwrap();

        let mut matched: Vec<Book> = store
            .books
            .iter()
            .filter(|b| title.is_empty() || b.title.to_lowercase() == title.to_lowercase())
            .filter(|b| genres.iter().all(|g| b.genres.contains(g)))
            .cloned()
            .collect();

        matched.sort_by(|a, b| {
            let primary = compare(a, b, order.column);
            let primary = match order.direction {
                SortDirection::Asc => primary,
                SortDirection::Desc => primary.reverse(),
            };
            primary.then(a.id.cmp(&b.id))
        });

        let total = matched.len() as i64;
        let page = matched
            .into_iter()
            .skip(filters.offset() as usize)
            .take(filters.limit() as usize)
            .collect();

        Ok((
            page,
            PaginationMetadata::calculate(total, filters.page, filters.size),
        ))
    }

    async fn search(&self, query: &str) -> Result<Vec<Book>, RepositoryError> {
        self.check_store()?;
        let terms = title_words(query);
        let store = self.store.lock().unwrap();
        let mut found: Vec<Book> = store
            .books
            .iter()
            .filter(|b| {
                let words = title_words(&b.title);
                terms.iter().all(|t| words.contains(t))
            })
            .cloned()
            .collect();
        found.sort_by_key(|b| b.id);
        Ok(found)
    }
}

pub fn new_book(title: &str, published: i32, pages: i32, genres: &[&str]) -> CreateBook {
    CreateBook {
        title: title.to_string(),
        published,
        pages,
        genres: genres.iter().map(|g| g.to_string()).collect(),
    }
}

pub fn service() -> (BookService, Arc<MemoryBookRepository>) {
    let repository = MemoryBookRepository::new();
    (BookService::new(repository.clone()), repository)
}

/// A small catalogue, inserted in id order.
pub async fn seed(service: &BookService) -> Vec<Book> {
    let mut books = Vec::new();
    for input in [
        new_book("Dune", 1965, 412, &["sci-fi", "classic"]),
        new_book("The Hobbit", 1937, 310, &["fantasy", "classic"]),
        new_book("Neuromancer", 1984, 271, &["sci-fi", "cyberpunk"]),
        new_book("The Dispossessed", 1974, 387, &["sci-fi"]),
        new_book("dune", 2021, 96, &["graphic-novel"]),
    ] {
        books.push(service.create(input).await.unwrap());
    }
    books
}
