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
        product::{Product, ProductQuery, ProductRequest},
    },
    routes::json_body,
    services::products::ProductService,
    AppState,
};

fn validated(req: ProductRequest) -> AppResult<ProductRequest> {
    if req.name.trim().is_empty() {
        return Err(AppError::Invalid("product name can't be empty".into()));
    }
    if req.category_id <= 0 {
        return Err(AppError::Invalid("category_id must be positive".into()));
    }
    Ok(req)
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let page = query.page();
    match query.category_id {
        Some(category_id) => ProductService::list_by_category(&state.db, category_id, &page).await,
        None => ProductService::list(&state.db, &page).await,
    }
    .map(Json)
}

pub async fn create_product(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    body: Result<Json<ProductRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let req = validated(json_body(body)?)?;
    let id = ProductService::create(&state.db, &req).await?;
    tracing::info!(
        product_id = id,
        category_id = req.category_id,
        by = %user.username,
        "product created"
    );
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn update_product(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    body: Result<Json<ProductRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let req = validated(json_body(body)?)?;
    let id = ProductService::update(&state.db, id, &req).await?;
    Ok(Json(json!({ "id": id })))
}

pub async fn delete_product(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let id = ProductService::delete(&state.db, id).await?;
    Ok(Json(json!({ "id": id })))
}
