use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::product::{Page, Product, ProductRequest},
    services::categories::CategoryService,
};

pub struct ProductService;

impl ProductService {
    pub async fn list(pool: &PgPool, page: &Page) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, category_id FROM product ORDER BY id DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;
        Ok(products)
    }

    pub async fn list_by_category(
        pool: &PgPool,
        category_id: i64,
        page: &Page,
    ) -> AppResult<Vec<Product>> {
        CategoryService::get(pool, category_id).await?;

        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, category_id FROM product
             WHERE category_id = $1
             ORDER BY id DESC LIMIT $2 OFFSET $3",
        )
        .bind(category_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;
        Ok(products)
    }

    pub async fn create(pool: &PgPool, req: &ProductRequest) -> AppResult<i64> {
        CategoryService::get(pool, req.category_id).await?;

        sqlx::query_scalar::<_, i64>(
            "INSERT INTO product (name, category_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(&req.name)
        .bind(req.category_id)
        .fetch_one(pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::AlreadyExists(_) => AppError::AlreadyExists(format!(
                "product {} already exists in category {}",
                req.name, req.category_id
            )),
            other => other.context("creating product"),
        })
    }

    pub async fn update(pool: &PgPool, id: i64, req: &ProductRequest) -> AppResult<i64> {
        CategoryService::get(pool, req.category_id).await?;

        sqlx::query_scalar::<_, i64>(
            "UPDATE product SET name = $1, category_id = $2 WHERE id = $3 RETURNING id",
        )
        .bind(&req.name)
        .bind(req.category_id)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::AlreadyExists(_) => AppError::AlreadyExists(format!(
                "product {} already exists in category {}",
                req.name, req.category_id
            )),
            other => other.context("updating product"),
        })?
        .ok_or_else(|| AppError::NotFound(format!("product {id} not found")))
    }

    pub async fn delete(pool: &PgPool, id: i64) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("DELETE FROM product WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {id} not found")))
    }
}
