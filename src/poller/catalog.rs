use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    models::{auth::TokenPair, category::Category},
    poller::{
        models::{Pet, SinkSource},
        PetSink, PollerError,
    },
};

#[derive(Debug, Deserialize)]
struct IdResponse {
    #[serde(default)]
    id: i64,
}

const CATEGORY_PAGE: usize = 100;

/// Writes pets into a running catalog API: sign in, resolve the category,
/// then create the product under it.
///
/// Category names are unique on the catalog side, so ids are remembered by
/// name and a `409` on create falls back to looking the existing one up.
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    categories: Mutex<HashMap<String, i64>>,
}

impl CatalogClient {
    pub fn new(
        base_url: &str,
        username: String,
        password: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
            categories: Mutex::new(HashMap::new()),
        })
    }

    pub async fn sign_in(&self) -> Result<String, PollerError> {
        let url = format!("{}/api/v1/user/sign-in", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&json!({ "username": self.username, "password": self.password }))
            .send()
            .await
            .map_err(|source| PollerError::Fetch {
                url: url.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PollerError::Status { url, status });
        }

        let pair: TokenPair = resp
            .json()
            .await
            .map_err(|source| PollerError::Decode { url, source })?;
        Ok(pair.access_token)
    }

    pub async fn create_category(
        &self,
        access_token: &str,
        name: &str,
    ) -> Result<i64, PollerError> {
        self.post_for_id("/api/v1/category", access_token, &json!({ "name": name }))
            .await
    }

    /// Id of the category called `name`, creating it when the catalog does not
    /// have one yet.
    pub async fn ensure_category(
        &self,
        access_token: &str,
        name: &str,
    ) -> Result<i64, PollerError> {
        if let Some(id) = self.cached_category(name) {
            return Ok(id);
        }

        let id = match self.create_category(access_token, name).await {
            Ok(id) => id,
            Err(e) if e.status() == Some(StatusCode::CONFLICT) => {
                tracing::debug!(category = name, "category exists, looking it up");
                self.find_category(name)
                    .await?
                    .ok_or_else(|| PollerError::Sink {
                        sink: SinkSource::Catalog,
                        message: format!("category {name} already exists but was not listed"),
                    })?
            }
            Err(e) => return Err(e),
        };

        self.lock_categories().insert(name.to_string(), id);
        Ok(id)
    }

    /// Walks the category listing page by page.
    pub async fn find_category(&self, name: &str) -> Result<Option<i64>, PollerError> {
        let url = format!("{}/api/v1/category", self.base_url);
        let mut offset = 0;

        loop {
            let resp = self
                .http
                .get(&url)
                .query(&[("limit", CATEGORY_PAGE), ("offset", offset)])
                .send()
                .await
                .map_err(|source| PollerError::Fetch {
                    url: url.clone(),
                    source,
                })?;

            let status = resp.status();
            if !status.is_success() {
                return Err(PollerError::Status { url, status });
            }

            let page: Vec<Category> = resp
                .json()
                .await
                .map_err(|source| PollerError::Decode {
                    url: url.clone(),
                    source,
                })?;

            if let Some(found) = page.iter().find(|c| c.name == name) {
                return Ok(Some(found.id));
            }
            if page.len() < CATEGORY_PAGE {
                return Ok(None);
            }
            offset += page.len();
        }
    }

    fn cached_category(&self, name: &str) -> Option<i64> {
        self.lock_categories().get(name).copied()
    }

    fn forget_category(&self, name: &str) {
        self.lock_categories().remove(name);
    }

    fn lock_categories(&self) -> MutexGuard<'_, HashMap<String, i64>> {
        self.categories.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub async fn create_product(
        &self,
        access_token: &str,
        name: &str,
        category_id: i64,
    ) -> Result<i64, PollerError> {
        self.post_for_id(
            "/api/v1/product",
            access_token,
            &json!({ "name": name, "category_id": category_id }),
        )
        .await
    }

    async fn post_for_id<B: Serialize + ?Sized>(
        &self,
        path: &str,
        access_token: &str,
        body: &B,
    ) -> Result<i64, PollerError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .map_err(|source| PollerError::Fetch {
                url: url.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PollerError::Status { url, status });
        }

        let created: IdResponse = resp
            .json()
            .await
            .map_err(|source| PollerError::Decode {
                url: url.clone(),
                source,
            })?;

        if created.id == 0 {
            return Err(PollerError::Sink {
                sink: SinkSource::Catalog,
                message: format!("{url} did not return an id"),
            });
        }
        Ok(created.id)
    }
}

#[async_trait]
impl PetSink for CatalogClient {
    async fn create(&self, pet: &Pet) -> Result<i64, PollerError> {
        let token = self.sign_in().await?;
        let category_id = self.ensure_category(&token, &pet.category.name).await?;
        let product_id = match self.create_product(&token, &pet.name, category_id).await {
            Ok(id) => id,
            Err(e) => {
                // The remembered category may have been deleted remotely.
                if e.status() == Some(StatusCode::NOT_FOUND) {
                    self.forget_category(&pet.category.name);
                }
                return Err(e);
            }
        };

        tracing::debug!(pet_id = pet.id, category_id, product_id, "pet written to catalog");
        Ok(product_id)
    }
}
