use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
}

/// Body of both create and update; update moves the product to `category_id`.
#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub category_id: i64,
}

/// `limit` / `offset` query string shared by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 10;

    pub fn limit(&self) -> i64 {
        match self.limit {
            Some(l) if l > 0 => l,
            _ => Self::DEFAULT_LIMIT,
        }
    }

    pub fn offset(&self) -> i64 {
        match self.offset {
            Some(o) if o >= 0 => o,
            _ => 0,
        }
    }
}

// Not `#[serde(flatten)]` over `Page`: flattened query params reach the
// inner struct as strings and fail to parse as integers.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub category_id: Option<i64>,
}

impl ProductQuery {
    pub fn page(&self) -> Page {
        Page {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults() {
        let page = Page {
            limit: Some(0),
            offset: Some(-3),
        };
        assert_eq!(page.limit(), 10);
        assert_eq!(page.offset(), 0);

        let page = Page {
            limit: Some(25),
            offset: Some(50),
        };
        assert_eq!(page.limit(), 25);
        assert_eq!(page.offset(), 50);
    }
}
