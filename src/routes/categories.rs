use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::{
        auth::AuthenticatedUser,
        category::{Category, CategoryRequest},
        product::Page,
    },
    routes::json_body,
    services::categories::CategoryService,
    AppState,
};

fn validated(req: CategoryRequest) -> AppResult<CategoryRequest> {
    if req.name.trim().is_empty() {
        return Err(AppError::Invalid("category name can't be empty".into()));
    }
    Ok(req)
}

pub async fn list_categories(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> AppResult<Json<Vec<Category>>> {
    CategoryService::list(&state.db, &page).await.map(Json)
}

pub async fn create_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    body: Result<Json<CategoryRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let req = validated(json_body(body)?)?;
    let id = CategoryService::create(&state.db, &req).await?;
    tracing::info!(category_id = id, by = %user.username, "category created");
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn update_category(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    body: Result<Json<CategoryRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let req = validated(json_body(body)?)?;
    let id = CategoryService::update(&state.db, id, &req).await?;
    Ok(Json(json!({ "id": id })))
}

pub async fn delete_category(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let id = CategoryService::delete(&state.db, id).await?;
    Ok(Json(json!({ "id": id })))
}
