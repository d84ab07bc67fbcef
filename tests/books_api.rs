mod support;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use bookshelf_app::modules::books::BooksModule;
use bookshelf_kernel::{settings::Settings, ModuleRegistry};

use support::MemoryBookRepository;

fn app_with(repository: Arc<MemoryBookRepository>) -> Router {
    let mut registry = ModuleRegistry::new();
    registry
        .register(Arc::new(BooksModule::new(repository)))
        .unwrap();
    bookshelf_http::build_router(&registry, &Settings::default())
}

fn app() -> Router {
    app_with(MemoryBookRepository::new())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, _, body) = send_raw(app, method, uri, body.map(|b| b.to_string())).await;
    (status, body)
}

async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, axum::http::HeaderMap, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

fn dune() -> Value {
    json!({
        "title": "Dune",
        "published": 1965,
        "pages": 412,
        "genres": ["sci-fi", "classic"]
    })
}

#[tokio::test]
async fn healthcheck_reports_availability() {
    let (status, body) = send(&app(), "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "available");
    assert_eq!(body["environment"], "local");
}

#[tokio::test]
async fn create_returns_201_with_location() {
    let app = app();
    let (status, headers, body) =
        send_raw(&app, "POST", "/api/books", Some(dune().to_string())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(headers[header::LOCATION], "/api/books/1");
    assert_eq!(body["book"]["id"], 1);
    assert_eq!(body["book"]["version"], 1);
    assert_eq!(body["book"]["genres"], json!(["sci-fi", "classic"]));
    assert!(body["book"]["created_at"].is_string());

    let (status, body) = send(&app, "GET", "/api/books/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"]["title"], "Dune");
}

#[tokio::test]
async fn create_with_invalid_fields_is_422_with_field_details() {
    let (status, body) = send(
        &app(),
        "POST",
        "/api/books",
        Some(json!({ "title": "", "published": 2999, "pages": 10, "genres": [] })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");
    let details = &body["error"]["details"];
    assert_eq!(details["title"], "must be provided");
    assert_eq!(details["genres"], "must be provided");
    assert!(details["published"]
        .as_str()
        .unwrap()
        .starts_with("publication date cannot exceed the range: 1430-"));
    assert!(details.get("pages").is_none());
}

#[tokio::test]
async fn malformed_json_is_400() {
    let (status, _, body) =
        send_raw(&app(), "POST", "/api/books", Some("{\"title\": ".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn unknown_body_fields_are_400() {
    let mut body = dune();
    body["rating"] = json!(5);
    let (status, _) = send(&app(), "POST", "/api/books", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_and_malformed_ids_are_404() {
    let app = app();
    for uri in ["/api/books/42", "/api/books/0", "/api/books/-1", "/api/books/abc"] {
        let (status, body) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["error"]["code"], "not_found");
    }

    let (status, _) = send(&app, "DELETE", "/api/books/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_routes_use_the_error_envelope() {
    let (status, body) = send(&app(), "GET", "/api/authors", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn unsupported_method_is_405_with_the_error_envelope() {
    let app = app();
    send(&app, "POST", "/api/books", Some(dune())).await;

    let (status, body) = send(&app, "PUT", "/api/books/1", Some(dune())).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["code"], "method_not_allowed");
    assert_eq!(
        body["error"]["message"],
        "the PUT method is not supported for this resource"
    );
}

#[tokio::test]
async fn patch_updates_present_fields_and_bumps_version() {
    let app = app();
    send(&app, "POST", "/api/books", Some(dune())).await;

    let (status, body) = send(
        &app,
        "PATCH",
        "/api/books/1",
        Some(json!({ "pages": 896, "version": 1 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"]["pages"], 896);
    assert_eq!(body["book"]["title"], "Dune");
    assert_eq!(body["book"]["version"], 2);
}

#[tokio::test]
async fn patch_with_stale_version_is_409() {
    let app = app();
    send(&app, "POST", "/api/books", Some(dune())).await;
    send(&app, "PATCH", "/api/books/1", Some(json!({ "pages": 500 }))).await;

    let (status, body) = send(
        &app,
        "PATCH",
        "/api/books/1",
        Some(json!({ "pages": 600, "version": 1 })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "edit_conflict");
}

#[tokio::test]
async fn patch_with_invalid_values_is_422() {
    let app = app();
    send(&app, "POST", "/api/books", Some(dune())).await;

    let (status, body) = send(
        &app,
        "PATCH",
        "/api/books/1",
        Some(json!({ "genres": ["a", "b", "c", "d", "e", "f"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["error"]["details"]["genres"],
        "must not exceed 5 items"
    );
}

#[tokio::test]
async fn delete_confirms_with_message() {
    let app = app();
    send(&app, "POST", "/api/books", Some(dune())).await;

    let (status, body) = send(&app, "DELETE", "/api/books/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "book successfully deleted" }));

    let (status, _) = send(&app, "GET", "/api/books/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_returns_books_with_metadata() {
    let app = app();
    for (title, published) in [("Dune", 1965), ("Emma", 1815), ("Ulysses", 1922)] {
        send(
            &app,
            "POST",
            "/api/books",
            Some(json!({ "title": title, "published": published, "pages": 100, "genres": ["novel"] })),
        )
        .await;
    }

    let (status, body) = send(&app, "GET", "/api/books?sort=-published&size=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["books"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Dune", "Ulysses"]);
    assert_eq!(
        body["metadata"],
        json!({
            "current_page": 1,
            "page_size": 2,
            "first_page": 1,
            "last_page": 2,
            "total_records": 3
        })
    );
}

#[tokio::test]
async fn list_breaks_sort_ties_by_ascending_id() {
    let app = app();
    for (title, published) in [("Emma", 1815), ("Mansfield Park", 1814), ("Persuasion", 1817), ("Waverley", 1814)] {
        send(
            &app,
            "POST",
            "/api/books",
            Some(json!({ "title": title, "published": published, "pages": 100, "genres": ["novel"] })),
        )
        .await;
    }

    let (status, body) = send(&app, "GET", "/api/books?sort=-published", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["books"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![3, 1, 2, 4]);
}

#[tokio::test]
async fn empty_list_has_zeroed_metadata() {
    let (status, body) = send(&app(), "GET", "/api/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["books"], json!([]));
    assert_eq!(body["metadata"]["total_records"], 0);
    assert_eq!(body["metadata"]["last_page"], 0);
}

#[tokio::test]
async fn list_rejects_bad_filters() {
    let (status, body) = send(
        &app(),
        "GET",
        "/api/books?page=0&size=abc&sort=rating",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let details = &body["error"]["details"];
    assert_eq!(details["page"], "must be greater than zero");
    assert_eq!(details["size"], "must be an integer");
    assert!(details["sort"]
        .as_str()
        .unwrap()
        .starts_with("can only contain values:"));
}

#[tokio::test]
async fn search_omits_metadata() {
    let app = app();
    send(&app, "POST", "/api/books", Some(dune())).await;

    let (status, body) = send(&app, "GET", "/api/books/search?q=dune", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["books"].as_array().unwrap().len(), 1);
    assert!(body.get("metadata").is_none());
}

#[tokio::test]
async fn store_failure_is_500_without_leaking_details() {
    let repository = MemoryBookRepository::new();
    let app = app_with(repository.clone());
    send(&app, "POST", "/api/books", Some(dune())).await;
    repository.fail_with_store_error();

    let (status, body) = send(&app, "GET", "/api/books/1", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "internal_error");
    assert_eq!(
        body["error"]["message"],
        "the server encountered a problem and could not process your request"
    );
}

#[tokio::test]
async fn openapi_document_lists_book_paths() {
    let (status, body) = send(&app(), "GET", "/docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/books"]["post"].is_object());
    assert!(body["paths"]["/api/books/{id}"]["patch"].is_object());
    assert!(body["components"]["schemas"]["Book"].is_object());
}
