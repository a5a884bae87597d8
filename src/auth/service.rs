use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Role, UserProfile, Wallet};
use crate::store::{LedgerStore, StoreError};

/// JWT claims. Sessions are stateless: nothing is stored server-side, a
/// token stays valid until `exp`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User email
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

/// The caller identity injected by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
}

impl AuthenticatedUser {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email ou mot de passe incorrect")]
    InvalidCredentials,

    /// Blocked, deactivated or archived account.
    #[error("Compte désactivé")]
    Inactive,

    #[error("Token invalide ou expiré")]
    InvalidToken,

    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

/// Input for account creation (Agent-driven, or the startup seed).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub national_id: String,
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub role: Role,
}

pub struct AuthService {
    store: Arc<dyn LedgerStore>,
    jwt_secret: String,
    token_ttl_hours: i64,
}

impl AuthService {
    pub fn new(store: Arc<dyn LedgerStore>, jwt_secret: String, token_ttl_hours: i64) -> Self {
        Self {
            store,
            jwt_secret,
            token_ttl_hours,
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::Internal(format!("hashing failed: {e}")))
    }

    /// Create a user with a fresh empty wallet. Unique-field collisions
    /// surface as [`StoreError::DuplicateUser`].
    pub async fn create_user(&self, req: NewUser) -> Result<(UserProfile, Wallet), StoreError> {
        let password_hash = self
            .hash_password(&req.password)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let profile = UserProfile {
            id: Uuid::new_v4(),
            national_id: req.national_id,
            last_name: req.last_name,
            first_name: req.first_name,
            email: req.email,
            phone: req.phone,
            role: req.role,
            active: true,
            archived: false,
            archived_at: None,
            archived_by: None,
            password_hash,
            created_at: Utc::now(),
        };
        let wallet = Wallet::new_for(req.role);
        self.store
            .create_user(profile.clone(), wallet.clone())
            .await?;
        Ok((profile, wallet))
    }

    /// Verify credentials and issue a JWT.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(String, UserProfile), AuthError> {
        let user = self
            .store
            .user_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| AuthError::Internal(format!("invalid hash format: {e}")))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;

        if !user.active || user.archived {
            return Err(AuthError::Inactive);
        }

        let token = self.issue_token(&user)?;
        Ok((token, user))
    }

    fn issue_token(&self, user: &UserProfile) -> Result<String, AuthError> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(Duration::hours(self.token_ttl_hours))
            .ok_or_else(|| AuthError::Internal("timestamp overflow".to_string()))?
            .timestamp();
        let claims = Claims {
            sub: user.email.clone(),
            role: user.role,
            exp: expiration as usize,
            iat: now.timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("failed to sign token: {e}")))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Resolve verified claims into a live caller. Deactivated or archived
    /// accounts lose access even with a valid token.
    pub async fn resolve(&self, claims: &Claims) -> Result<AuthenticatedUser, AuthError> {
        let user = self
            .store
            .user_by_email(&claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if !user.active || user.archived {
            return Err(AuthError::Inactive);
        }
        Ok(AuthenticatedUser {
            id: user.id,
            email: user.email,
            role: user.role,
            first_name: user.first_name,
            last_name: user.last_name,
        })
    }
}
