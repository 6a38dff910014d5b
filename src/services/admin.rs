//! Dashboard authentication: one shared admin password, stateless JWT sessions

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{TimeZone, Utc};

use crate::{
    config::AdminConfig,
    error::{AppError, AppResult},
    models::admin::{AdminClaims, LoginResponse},
};

const ADMIN_SUBJECT: &str = "admin";

#[derive(Clone)]
pub struct AdminService {
    password_hash: String,
    jwt_secret: String,
    token_hours: u64,
}

impl AdminService {
    /// Use the configured argon2 hash, or hash the plain password once at startup
    pub fn new(config: &AdminConfig) -> AppResult<Self> {
        let password_hash = match (&config.password_hash, &config.password) {
            (Some(hash), _) => {
                PasswordHash::new(hash)
                    .map_err(|_| AppError::Internal("Invalid admin.password_hash".to_string()))?;
                hash.clone()
            }
            (None, Some(password)) if !password.is_empty() => hash_password(password)?,
            _ => {
                return Err(AppError::Internal(
                    "admin.password or admin.password_hash must be set".to_string(),
                ))
            }
        };

        Ok(Self {
            password_hash,
            jwt_secret: config.jwt_secret.clone(),
            token_hours: config.token_hours,
        })
    }

    /// Check the dashboard password and issue a session token
    pub fn login(&self, password: &str) -> AppResult<LoginResponse> {
        if !self.verify_password(password)? {
            tracing::warn!("Rejected dashboard login");
            return Err(AppError::Authentication("Invalid password".to_string()));
        }

        let now = Utc::now().timestamp();
        let exp = now + (self.token_hours as i64 * 3600);
        let claims = AdminClaims {
            sub: ADMIN_SUBJECT.to_string(),
            exp,
            iat: now,
        };

        let token = claims
            .create_token(&self.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;
        let expires_at = Utc
            .timestamp_opt(exp, 0)
            .single()
            .ok_or_else(|| AppError::Internal("Token expiry out of range".to_string()))?;

        tracing::info!("Dashboard session issued");
        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_at,
        })
    }

    /// Validate a bearer token (signature, expiry and subject)
    pub fn verify_token(&self, token: &str) -> AppResult<AdminClaims> {
        let claims = AdminClaims::from_token(token, &self.jwt_secret)
            .map_err(|_| AppError::Authentication("Invalid or expired token".to_string()))?;
        if claims.sub != ADMIN_SUBJECT {
            return Err(AppError::Authentication("Invalid or expired token".to_string()));
        }
        Ok(claims)
    }

    fn verify_password(&self, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&self.password_hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}
