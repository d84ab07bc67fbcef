pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Migration, Module};

use repository::{BookRepository, PgBookRepository};
use service::BookService;

/// Public path the books API is served under
pub const BOOKS_PATH: &str = "/api/books";

/// Book catalog: CRUD, filtered listing and title search
pub struct BooksModule {
    service: BookService,
}

impl BooksModule {
    pub fn new(repository: Arc<dyn BookRepository>) -> Self {
        Self {
            service: BookService::new(repository),
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    fn mount_path(&self) -> String {
        BOOKS_PATH.to_string()
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ctx.settings.environment.as_str(),
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![
            Migration {
                id: "001_create_books",
                up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id bigserial PRIMARY KEY,
                    created_at timestamptz NOT NULL DEFAULT now(),
                    title text NOT NULL,
                    published integer NOT NULL,
                    pages integer NOT NULL,
                    genres text[] NOT NULL,
                    version integer NOT NULL DEFAULT 1
                );
                "#,
            },
            Migration {
                id: "002_add_indexes",
                up: r#"
                ALTER TABLE books ADD CONSTRAINT books_pages_check CHECK (pages > 0);
                ALTER TABLE books ADD CONSTRAINT books_genres_length_check
                    CHECK (cardinality(genres) BETWEEN 1 AND 5);
                CREATE INDEX IF NOT EXISTS books_title_idx
                    ON books USING GIN (to_tsvector('simple', title));
                CREATE INDEX IF NOT EXISTS books_genres_idx ON books USING GIN (genres);
                "#,
            },
        ]
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn book_response(description: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/BookEnvelope" }
            }
        }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let id_param = serde_json::json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64", "minimum": 1 }
    });

    serde_json::json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "operationId": "listBooks",
                    "tags": ["Books"],
                    "parameters": [
                        { "name": "title", "in": "query", "schema": { "type": "string" } },
                        { "name": "genres", "in": "query", "description": "Comma-separated; every genre must match", "schema": { "type": "string" } },
                        { "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 1, "maximum": 1000, "default": 1 } },
                        { "name": "size", "in": "query", "schema": { "type": "integer", "minimum": 1, "maximum": 20, "default": 12 } },
                        { "name": "sort", "in": "query", "schema": {
                            "type": "string",
                            "enum": ["id", "title", "published", "pages", "-id", "-title", "-published", "-pages"],
                            "default": "id"
                        } }
                    ],
                    "responses": {
                        "200": {
                            "description": "A page of books",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookPage" }
                                }
                            }
                        },
                        "422": error_response("Invalid filters"),
                        "500": error_response("Internal server error")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "operationId": "createBook",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/CreateBook" }
                            }
                        }
                    },
                    "responses": {
                        "201": book_response("Book created"),
                        "400": error_response("Malformed body"),
                        "422": error_response("Validation failed"),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/search": {
                "get": {
                    "summary": "Full-text search on title",
                    "operationId": "searchBooks",
                    "tags": ["Books"],
                    "parameters": [
                        { "name": "q", "in": "query", "schema": { "type": "string", "maxLength": 50 } }
                    ],
                    "responses": {
                        "200": {
                            "description": "Matching books ordered by id",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {
                                            "books": {
                                                "type": "array",
                                                "items": { "$ref": "#/components/schemas/Book" }
                                            }
                                        }
                                    }
                                }
                            }
                        },
                        "422": error_response("Query too long"),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a book",
                    "operationId": "showBook",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "responses": {
                        "200": book_response("The book"),
                        "404": error_response("Book not found"),
                        "500": error_response("Internal server error")
                    }
                },
                "patch": {
                    "summary": "Update a book",
                    "operationId": "updateBook",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/UpdateBook" }
                            }
                        }
                    },
                    "responses": {
                        "200": book_response("The updated book"),
                        "400": error_response("Malformed body"),
                        "404": error_response("Book not found"),
                        "409": error_response("Edit conflict"),
                        "422": error_response("Validation failed"),
                        "500": error_response("Internal server error")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "operationId": "deleteBook",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "responses": {
                        "200": {
                            "description": "Book deleted",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": { "message": { "type": "string" } }
                                    }
                                }
                            }
                        },
                        "404": error_response("Book not found"),
                        "500": error_response("Internal server error")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "created_at": { "type": "string", "format": "date-time" },
                        "title": { "type": "string", "maxLength": 56 },
                        "published": { "type": "integer", "minimum": 1430 },
                        "pages": { "type": "integer", "minimum": 1 },
                        "genres": {
                            "type": "array",
                            "items": { "type": "string" },
                            "minItems": 1,
                            "maxItems": 5,
                            "uniqueItems": true
                        },
                        "version": { "type": "integer", "minimum": 1 }
                    },
                    "required": ["id", "created_at", "title", "published", "pages", "genres", "version"]
                },
                "BookEnvelope": {
                    "type": "object",
                    "properties": { "book": { "$ref": "#/components/schemas/Book" } },
                    "required": ["book"]
                },
                "BookPage": {
                    "type": "object",
                    "properties": {
                        "books": {
                            "type": "array",
                            "items": { "$ref": "#/components/schemas/Book" }
                        },
                        "metadata": { "$ref": "#/components/schemas/PaginationMetadata" }
                    },
                    "required": ["books", "metadata"]
                },
                "PaginationMetadata": {
                    "type": "object",
                    "properties": {
                        "current_page": { "type": "integer" },
                        "page_size": { "type": "integer" },
                        "first_page": { "type": "integer" },
                        "last_page": { "type": "integer" },
                        "total_records": { "type": "integer" }
                    }
                },
                "CreateBook": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "maxLength": 56 },
                        "published": { "type": "integer" },
                        "pages": { "type": "integer" },
                        "genres": { "type": "array", "items": { "type": "string" } }
                    },
                    "required": ["title", "published", "pages", "genres"]
                },
                "UpdateBook": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "maxLength": 56 },
                        "published": { "type": "integer" },
                        "pages": { "type": "integer" },
                        "genres": { "type": "array", "items": { "type": "string" } },
                        "version": {
                            "type": "integer",
                            "description": "Last version read; a mismatch yields 409"
                        }
                    }
                }
            }
        }
    })
}

/// Create the books module backed by PostgreSQL
pub fn create_module(pool: bookshelf_db::DbPool) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(Arc::new(PgBookRepository::new(pool))))
}
