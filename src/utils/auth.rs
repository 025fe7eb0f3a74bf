use anyhow::{Result, anyhow};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Lifetime of a login session
pub const SESSION_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user_id
    pub exp: usize,
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

pub fn create_jwt(user_id: i32, secret: &str) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(SESSION_HOURS))
        .ok_or_else(|| anyhow!("session expiry out of range"))?
        .timestamp();

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration as usize,
        jti: uuid::Uuid::new_v4().to_string(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok(token)
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_cycle() {
        let secret = "test_secret";
        let token = create_jwt(42, secret).unwrap();
        let claims = validate_jwt(&token, secret).unwrap();
        assert_eq!(claims.user_id(), Some(42));
    }

    #[test]
    fn test_jwt_rejects_other_secret() {
        let token = create_jwt(7, "one-secret").unwrap();
        assert!(validate_jwt(&token, "another-secret").is_err());
    }

    #[test]
    fn test_jwt_rejects_garbage() {
        assert!(validate_jwt("not-a-token", "secret").is_err());
    }
}
