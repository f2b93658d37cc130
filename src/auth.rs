//! Role-based authentication: credential checks against the database's own
//! auth functions, HS256 access tokens, and the bearer-token extractor.

use crate::config::Settings;
use crate::error::AppError;
use crate::pool::PoolRegistry;
use crate::state::AppState;
use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::{Connection, PgConnection};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub role: String,
    pub uname: String,
    pub exp: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub role: String,
}

pub fn issue_token(settings: &Settings, uname: &str, role: &str) -> Result<String, AppError> {
    let exp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| AppError::Config("system clock before epoch".to_string()))?
        .as_secs()
        + settings.jwt_lifetime.as_secs();
    let claims = Claims {
        role: role.to_string(),
        uname: uname.to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_key.as_bytes()),
    )
    .map_err(|e| AppError::Config(format!("token signing failed: {}", e)))
}

pub fn verify_token(settings: &Settings, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.jwt_key.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Auth("token has expired".to_string())
        }
        _ => AppError::Auth("invalid token".to_string()),
    })
}

/// Validate credentials against the database and resolve the caller's role.
/// The database connection itself is the first check: bad credentials never
/// get as far as the auth functions.
pub async fn login(
    settings: &Settings,
    pools: &PoolRegistry,
    uname: &str,
    pword: &str,
) -> Result<TokenResponse, AppError> {
    let role = if uname == settings.public_role {
        uname.to_string()
    } else {
        resolve_role(settings, uname, pword).await?
    };
    pools.get_or_create(&role, Some((uname, pword))).await?;
    let access_token = issue_token(settings, uname, &role)?;
    Ok(TokenResponse {
        access_token,
        token_type: "bearer",
        role,
    })
}

/// Guest access: the public role with configured credentials.
pub async fn guest(settings: &Settings, pools: &PoolRegistry) -> Result<TokenResponse, AppError> {
    let role = settings.public_role.clone();
    pools.get_or_create(&role, None).await?;
    let access_token = issue_token(settings, &role, &role)?;
    Ok(TokenResponse {
        access_token,
        token_type: "bearer",
        role,
    })
}

async fn resolve_role(settings: &Settings, uname: &str, pword: &str) -> Result<String, AppError> {
    let mut conn = PgConnection::connect(&settings.dsn(uname, pword))
        .await
        .map_err(|e| {
            tracing::warn!(uname, error = %e, "credential check failed");
            AppError::Auth("authentication failed".to_string())
        })?;
    let valid: bool = sqlx::query_scalar("SELECT shared.user_validate($1, $2)")
        .bind(uname)
        .bind(pword)
        .fetch_one(&mut conn)
        .await
        .map_err(AppError::from_db)?;
    if !valid {
        return Err(AppError::Auth("authentication failed".to_string()));
    }
    let role: Option<String> = sqlx::query_scalar("SELECT shared.user_authorize($1, $2)")
        .bind(uname)
        .bind(pword)
        .fetch_optional(&mut conn)
        .await
        .map_err(AppError::from_db)?;
    let _ = conn.close().await;
    role.ok_or_else(|| AppError::Auth("authentication failed".to_string()))
}

/// Verified claims of the request's bearer token.
pub struct AuthClaims(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthClaims
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Auth("missing bearer token".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Auth("missing bearer token".to_string()))?;
        Ok(AuthClaims(verify_token(&app.settings, token)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings() -> Settings {
        Settings {
            bind_addr: "127.0.0.1:0".into(),
            db_host: "localhost".into(),
            db_port: 5432,
            db_base: "postgres".into(),
            data_schema: "pi".into(),
            public_role: "customer".into(),
            public_password: "secret".into(),
            pool_min_size: 1,
            pool_max_size: 15,
            acquire_timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(30),
            jwt_key: "test-signing-key".into(),
            jwt_lifetime: Duration::from_secs(1800),
        }
    }

    #[test]
    fn tokens_round_trip() {
        let settings = settings();
        let token = issue_token(&settings, "alice", "manager").unwrap();
        let claims = verify_token(&settings, &token).unwrap();
        assert_eq!(claims.role, "manager");
        assert_eq!(claims.uname, "alice");
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let settings = settings();
        let claims = Claims {
            role: "manager".into(),
            uname: "alice".into(),
            exp: 1, // 1970
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(settings.jwt_key.as_bytes()),
        )
        .unwrap();
        let err = verify_token(&settings, &token);
        assert!(matches!(err, Err(AppError::Auth(msg)) if msg.contains("expired")));
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        let settings = settings();
        assert!(matches!(
            verify_token(&settings, "not-a-token"),
            Err(AppError::Auth(_))
        ));
    }
}
