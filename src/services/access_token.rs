use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::auth::{AccessTokenData, Claims},
};

const ALGORITHM: Algorithm = Algorithm::HS512;

/// Issues and checks HS512 access tokens. Stateless; clone freely.
#[derive(Clone)]
pub struct AccessTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl AccessTokenService {
    pub fn new(secret: &str, ttl_minutes: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
            clock,
        }
    }

    pub fn create(&self, data: &AccessTokenData) -> AppResult<String> {
        let exp = (self.clock.now() + self.ttl).timestamp().max(0) as usize;
        let claims = Claims {
            username: data.username.clone(),
            refresh_token_id: data.refresh_token_id,
            exp,
        };
        encode(&Header::new(ALGORITHM), &claims, &self.encoding).map_err(|e| {
            tracing::warn!(error = %e, "can't sign access token");
            AppError::Internal(format!("can't sign access token: {e}"))
        })
    }

    /// Check signature, structure and expiry.
    pub fn parse(&self, token: &str) -> AppResult<AccessTokenData> {
        let claims = self.decode(token)?;
        if (claims.exp as i64) <= self.clock.now().timestamp() {
            tracing::warn!(username = %claims.username, "access token has expired");
            return Err(AppError::Expired("access token has expired".into()));
        }
        Ok(claims.into())
    }

    pub fn verify(&self, token: &str) -> AppResult<()> {
        self.parse(token).map(|_| ())
    }

    // Expiry is compared against the injected clock in `parse`, so
    // jsonwebtoken's own wall-clock check is switched off here.
    fn decode(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidToken
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => {
                    tracing::warn!(error = %e, "can't parse access token");
                    AppError::InvalidToken("access token has been modified or corrupted".into())
                }
                _ => {
                    tracing::warn!(error = %e, "unexpected access token failure");
                    AppError::InvalidToken(format!("access token rejected: {e}"))
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use uuid::Uuid;

    fn service(clock: ManualClock) -> AccessTokenService {
        AccessTokenService::new("test-secret", 15, Arc::new(clock))
    }

    fn data() -> AccessTokenData {
        AccessTokenData {
            username: "alice".into(),
            refresh_token_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn claims_round_trip() {
        let svc = service(ManualClock::default());
        let input = data();
        let token = svc.create(&input).unwrap();
        assert_eq!(svc.parse(&token).unwrap(), input);
        assert!(svc.verify(&token).is_ok());
    }

    #[test]
    fn wrong_secret_is_invalid_token() {
        let clock = ManualClock::default();
        let token = service(clock.clone()).create(&data()).unwrap();
        let other = AccessTokenService::new("another-secret", 15, Arc::new(clock));
        assert!(matches!(other.parse(&token), Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn garbage_is_invalid_token() {
        let svc = service(ManualClock::default());
        assert!(matches!(svc.parse("not.a.jwt"), Err(AppError::InvalidToken(_))));
        assert!(matches!(svc.verify(""), Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn tampered_payload_is_invalid_token() {
        let svc = service(ManualClock::default());
        let token = svc.create(&data()).unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let mut payload = parts[1].clone().into_bytes();
        payload[0] = if payload[0] == b'a' { b'b' } else { b'a' };
        parts[1] = String::from_utf8(payload).unwrap();
        assert!(matches!(svc.parse(&parts.join(".")), Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_expired() {
        let clock = ManualClock::default();
        let svc = service(clock.clone());
        let token = svc.create(&data()).unwrap();

        clock.advance(Duration::minutes(16));

        assert!(matches!(svc.parse(&token), Err(AppError::Expired(_))));
        assert!(matches!(svc.verify(&token), Err(AppError::Expired(_))));
    }
}
