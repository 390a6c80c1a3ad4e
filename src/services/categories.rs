use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{
        category::{Category, CategoryRequest},
        product::Page,
    },
};

pub struct CategoryService;

impl CategoryService {
    pub async fn list(pool: &PgPool, page: &Page) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name FROM category ORDER BY id ASC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;
        Ok(categories)
    }

    pub async fn get(pool: &PgPool, id: i64) -> AppResult<Category> {
        sqlx::query_as::<_, Category>("SELECT id, name FROM category WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("category {id} not found")))
    }

    pub async fn create(pool: &PgPool, req: &CategoryRequest) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("INSERT INTO category (name) VALUES ($1) RETURNING id")
            .bind(&req.name)
            .fetch_one(pool)
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::AlreadyExists(_) => {
                    AppError::AlreadyExists(format!("category {} already exists", req.name))
                }
                other => other.context("creating category"),
            })
    }

    pub async fn update(pool: &PgPool, id: i64, req: &CategoryRequest) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("UPDATE category SET name = $1 WHERE id = $2 RETURNING id")
            .bind(&req.name)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::AlreadyExists(_) => {
                    AppError::AlreadyExists(format!("category {} already exists", req.name))
                }
                other => other.context("updating category"),
            })?
            .ok_or_else(|| AppError::NotFound(format!("category {id} not found")))
    }

    /// Products of the category go with it (ON DELETE CASCADE).
    pub async fn delete(pool: &PgPool, id: i64) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("DELETE FROM category WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("category {id} not found")))
    }
}
