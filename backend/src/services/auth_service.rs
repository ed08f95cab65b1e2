//! Authentication service.
//!
//! A single administrator identity comes from configuration. Its password is
//! hashed once at start-up; logins are checked against that hash and answered
//! with a signed access token.

use std::sync::Arc;

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, Result};

/// Upper bound on the access token lifetime (one year).
const MAX_TOKEN_LIFETIME_MINUTES: i64 = 366 * 24 * 60;

/// Allowed length, in characters, of login username and password.
pub const CREDENTIAL_MIN_LEN: usize = 4;
pub const CREDENTIAL_MAX_LEN: usize = 25;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token type, always "access"
    pub token_type: String,
}

/// Issued access token
#[derive(Debug)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: u64,
}

/// Authentication service
pub struct AuthService {
    config: Arc<Config>,
    admin_password_hash: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    /// Create the service, hashing the configured admin password.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        Self::with_hash_cost(config, DEFAULT_COST)
    }

    pub fn with_hash_cost(config: Arc<Config>, cost: u32) -> Result<Self> {
        let admin_password_hash = hash(&config.admin_password, cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;
        let secret = config.jwt_secret.clone();
        Ok(Self {
            config,
            admin_password_hash,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Check credentials and issue an access token.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<AccessToken> {
        validate_credential_length("username", username)?;
        validate_credential_length("password", password)?;

        let password_ok = verify(password, &self.admin_password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if username != self.config.admin_username || !password_ok {
            tracing::warn!(username = %username, "Rejected login");
            return Err(AppError::Authentication(
                "Invalid username or password".to_string(),
            ));
        }

        tracing::info!(username = %username, "Login succeeded");
        self.generate_token(username)
    }

    pub fn generate_token(&self, username: &str) -> Result<AccessToken> {
        let now = Utc::now();
        let lifetime = self.token_lifetime_minutes();
        let exp = now + Duration::minutes(lifetime);
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            token_type: "access".to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))?;

        Ok(AccessToken {
            token,
            expires_in: (lifetime * 60) as u64,
        })
    }

    /// Validate and decode an access token
    pub fn validate_access_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))?;

        if token_data.claims.token_type != "access" {
            return Err(AppError::Authentication("Invalid token type".to_string()));
        }
        Ok(token_data.claims)
    }

    /// Configured token lifetime, clamped to one minute .. one year.
    fn token_lifetime_minutes(&self) -> i64 {
        self.config
            .jwt_access_token_expiry_minutes
            .clamp(1, MAX_TOKEN_LIFETIME_MINUTES)
    }
}

fn validate_credential_length(field: &str, value: &str) -> Result<()> {
    let len = value.chars().count();
    if !(CREDENTIAL_MIN_LEN..=CREDENTIAL_MAX_LEN).contains(&len) {
        return Err(AppError::Validation(format!(
            "{} must be between {} and {} characters",
            field, CREDENTIAL_MIN_LEN, CREDENTIAL_MAX_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::with_hash_cost(Arc::new(Config::for_tests("/tmp/unused")), 4).unwrap()
    }

    #[test]
    fn test_admin_login_issues_valid_token() {
        let auth = service();
        let token = auth.authenticate("admin", "password").unwrap();
        assert_eq!(token.expires_in, 30 * 60);

        let claims = auth.validate_access_token(&token.token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn test_wrong_password_or_user_is_rejected() {
        let auth = service();
        assert!(matches!(
            auth.authenticate("admin", "wrong-pass"),
            Err(AppError::Authentication(_))
        ));
        assert!(matches!(
            auth.authenticate("someone", "password"),
            Err(AppError::Authentication(_))
        ));
    }

    #[test]
    fn test_credential_length_limits() {
        let auth = service();
        assert!(matches!(
            auth.authenticate("adm", "password"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            auth.authenticate("admin", &"p".repeat(26)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let auth = service();
        let mut other_config = Config::for_tests("/tmp/unused");
        other_config.jwt_secret = "another-secret".into();
        let other = AuthService::with_hash_cost(Arc::new(other_config), 4).unwrap();

        let token = other.generate_token("admin").unwrap();
        assert!(auth.validate_access_token(&token.token).is_err());
        assert!(auth.validate_access_token("garbage").is_err());
    }

    #[test]
    fn test_extreme_token_lifetime_is_clamped() {
        let mut config = Config::for_tests("/tmp/unused");
        config.jwt_access_token_expiry_minutes = i64::MAX;
        let auth = AuthService::with_hash_cost(Arc::new(config), 4).unwrap();

        let token = auth.generate_token("admin").unwrap();
        assert_eq!(token.expires_in, (MAX_TOKEN_LIFETIME_MINUTES * 60) as u64);
        assert_eq!(auth.validate_access_token(&token.token).unwrap().sub, "admin");
    }
}
