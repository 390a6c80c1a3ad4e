use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_minutes: i64,
    pub bcrypt_cost: u32,
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub reaper_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            db_max_connections: parsed_or("DB_MAX_CONNECTIONS", 20)?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl_minutes: ttl_minutes("ACCESS_TOKEN_TTL_MINUTES", 15)?,
            // 30 days
            refresh_token_ttl_minutes: ttl_minutes("REFRESH_TOKEN_TTL_MINUTES", 43_200)?,
            bcrypt_cost: parsed_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parsed_or("PORT", 8080)?,
            request_timeout_secs: parsed_nonzero("REQUEST_TIMEOUT_SECS", 5)?,
            reaper_interval_secs: parsed_nonzero("REAPER_INTERVAL_SECS", 300)?,
        })
    }
}

/// Settings for the pet-store ingestion poller binary.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub source_url: String,
    pub catalog_api_url: String,
    pub catalog_username: String,
    pub catalog_password: String,
    pub poll_interval_secs: u64,
    pub cache_ttl_minutes: i64,
    pub http_timeout_secs: u64,
}

impl PollerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            source_url: required("PETSTORE_SOURCE_URL")?,
            catalog_api_url: required("CATALOG_API_URL")?
                .trim_end_matches('/')
                .to_string(),
            catalog_username: required("CATALOG_USERNAME")?,
            catalog_password: required("CATALOG_PASSWORD")?,
            poll_interval_secs: parsed_nonzero("POLL_INTERVAL_SECS", 60)?,
            cache_ttl_minutes: ttl_minutes("POLL_CACHE_TTL_MINUTES", 720)?,
            http_timeout_secs: parsed_nonzero("HTTP_TIMEOUT_SECS", 10)?,
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Missing required env var: {}", key))
}

/// Upper bound for any TTL: ten years.
const MAX_TTL_MINUTES: i64 = 10 * 365 * 24 * 60;

fn parsed_nonzero(key: &str, default: u64) -> anyhow::Result<u64> {
    match parsed_or(key, default)? {
        0 => Err(anyhow::anyhow!("Invalid value for {key}: must be greater than 0")),
        v => Ok(v),
    }
}

fn ttl_minutes(key: &str, default: i64) -> anyhow::Result<i64> {
    let v = parsed_or(key, default)?;
    if !(1..=MAX_TTL_MINUTES).contains(&v) {
        return Err(anyhow::anyhow!(
            "Invalid value for {key}={v}: must be between 1 and {MAX_TTL_MINUTES} minutes"
        ));
    }
    Ok(v)
}

fn parsed_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {key}={raw:?}: {e}")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_or_falls_back_when_unset() {
        let v: u64 = parsed_or("PRODUCT_CATALOG_TEST_UNSET_VAR", 42).unwrap();
        assert_eq!(v, 42);
    }

    #[test]
    fn zero_interval_is_rejected() {
        env::set_var("PRODUCT_CATALOG_TEST_ZERO_INTERVAL", "0");
        let err = parsed_nonzero("PRODUCT_CATALOG_TEST_ZERO_INTERVAL", 60).unwrap_err();
        assert!(err.to_string().contains("greater than 0"), "{err}");

        env::set_var("PRODUCT_CATALOG_TEST_GOOD_INTERVAL", "15");
        assert_eq!(parsed_nonzero("PRODUCT_CATALOG_TEST_GOOD_INTERVAL", 60).unwrap(), 15);
        assert_eq!(parsed_nonzero("PRODUCT_CATALOG_TEST_UNSET_INTERVAL", 60).unwrap(), 60);
    }

    #[test]
    fn ttl_out_of_range_is_rejected() {
        for (key, raw) in [
            ("PRODUCT_CATALOG_TEST_TTL_ZERO", "0"),
            ("PRODUCT_CATALOG_TEST_TTL_NEGATIVE", "-5"),
            ("PRODUCT_CATALOG_TEST_TTL_HUGE", "9223372036854775807"),
        ] {
            env::set_var(key, raw);
            assert!(ttl_minutes(key, 15).is_err(), "{key}={raw} accepted");
        }

        env::set_var("PRODUCT_CATALOG_TEST_TTL_OK", "43200");
        assert_eq!(ttl_minutes("PRODUCT_CATALOG_TEST_TTL_OK", 15).unwrap(), 43_200);
    }

    #[test]
    fn required_reports_the_missing_key() {
        let err = required("PRODUCT_CATALOG_TEST_MISSING_VAR").unwrap_err();
        assert!(err.to_string().contains("PRODUCT_CATALOG_TEST_MISSING_VAR"));
    }
}
