use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use bookshelf_http::error::AppError;

use super::models::{
    BookEnvelope, BookListEnvelope, CreateBook, ListParams, MessageEnvelope, SearchParams,
    UpdateBook,
};
use super::service::BookService;
use super::BOOKS_PATH;

/// Routes relative to the module mount path.
pub fn router(service: BookService) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/search", get(search_books))
        .route(
            "/{id}",
            get(show_book).patch(update_book).delete(delete_book),
        )
        .with_state(service)
}

/// Unparseable ids are reported as missing resources.
fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse().map_err(|_| AppError::not_found())
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

async fn create_book(
    State(service): State<BookService>,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let input = json_body(payload)?;
    let book = service.create(input).await?;
    let location = format!("{BOOKS_PATH}/{}", book.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(BookEnvelope { book }),
    ))
}

async fn show_book(
    State(service): State<BookService>,
    Path(id): Path<String>,
) -> Result<Json<BookEnvelope>, AppError> {
    let book = service.get(parse_id(&id)?).await?;
    Ok(Json(BookEnvelope { book }))
}

async fn update_book(
    State(service): State<BookService>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBook>, JsonRejection>,
) -> Result<Json<BookEnvelope>, AppError> {
    let id = parse_id(&id)?;
    let input = json_body(payload)?;
    let book = service.update(id, input).await?;
    Ok(Json(BookEnvelope { book }))
}

async fn delete_book(
    State(service): State<BookService>,
    Path(id): Path<String>,
) -> Result<Json<MessageEnvelope>, AppError> {
    service.delete(parse_id(&id)?).await?;
    Ok(Json(MessageEnvelope {
        message: "book successfully deleted",
    }))
}

async fn list_books(
    State(service): State<BookService>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<BookListEnvelope>, AppError> {
    let Query(params) = params.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let (books, metadata) = service.list(params).await?;
    Ok(Json(BookListEnvelope {
        books,
        metadata: Some(metadata),
    }))
}

async fn search_books(
    State(service): State<BookService>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<BookListEnvelope>, AppError> {
    let Query(params) = params.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let books = service.search(&params.q).await?;
    Ok(Json(BookListEnvelope {
        books,
        metadata: None,
    }))
}
