//! Catalog and bookmark endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{error::AppResult, models::Book};

/// Bookmark request body
#[derive(Deserialize, ToSchema)]
pub struct BookmarkBody {
    pub user_id: Uuid,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// List every book with its availability
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    responses(
        (status = 200, description = "Catalog", body = Vec<Book>)
    )
)]
pub async fn list_books(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Book>>> {
    Ok(Json(state.services.catalog.list_books().await?))
}

/// Bookmark a book
#[utoipa::path(
    post,
    path = "/books/{book_id}/bookmark",
    tag = "books",
    params(
        ("book_id" = Uuid, Path, description = "Book ID")
    ),
    request_body = BookmarkBody,
    responses(
        (status = 201, description = "Book bookmarked", body = MessageResponse),
        (status = 400, description = "Book already bookmarked"),
        (status = 404, description = "User or book not found")
    )
)]
pub async fn add_bookmark(
    State(state): State<crate::AppState>,
    Path(book_id): Path<Uuid>,
    Json(body): Json<BookmarkBody>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    state.services.catalog.add_bookmark(body.user_id, book_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Book bookmarked successfully".to_string(),
        }),
    ))
}

/// Remove a bookmark
#[utoipa::path(
    delete,
    path = "/books/{book_id}/bookmark",
    tag = "books",
    params(
        ("book_id" = Uuid, Path, description = "Book ID")
    ),
    request_body = BookmarkBody,
    responses(
        (status = 200, description = "Bookmark removed", body = MessageResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn remove_bookmark(
    State(state): State<crate::AppState>,
    Path(book_id): Path<Uuid>,
    Json(body): Json<BookmarkBody>,
) -> AppResult<Json<MessageResponse>> {
    state.services.catalog.remove_bookmark(body.user_id, book_id).await?;

    Ok(Json(MessageResponse {
        message: "Bookmark removed successfully".to_string(),
    }))
}

/// Bookmarked books of a user
#[utoipa::path(
    get,
    path = "/users/{id}/bookmarks",
    tag = "books",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Bookmarked books", body = Vec<Book>),
        (status = 404, description = "User not found")
    )
)]
pub async fn list_bookmarks(
    State(state): State<crate::AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<Book>>> {
    Ok(Json(state.services.catalog.list_bookmarks(user_id).await?))
}
