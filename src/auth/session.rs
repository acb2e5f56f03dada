use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::models::SessionClaims;
use crate::db::models::User;
use crate::error::AppError;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "dealroom_session";

/// Signs and verifies session tokens (HS256 JWT).
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    secure_cookie: bool,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl: Duration, secure_cookie: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            secure_cookie,
        }
    }

    /// Build the claims for `user`, valid from now for the configured TTL.
    pub fn claims_for(&self, user: &User) -> SessionClaims {
        let now = Utc::now();
        SessionClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        }
    }

    pub fn issue(&self, claims: &SessionClaims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign session token: {e}")))
    }

    /// Verify signature and expiry. Any failure yields `AppError::Auth`.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Auth(format!("Invalid session: {e}")))
    }

    /// Read and verify the session cookie, if any.
    pub fn claims_from_jar(&self, jar: &CookieJar) -> Option<SessionClaims> {
        let cookie = jar.get(SESSION_COOKIE)?;
        match self.verify(cookie.value()) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::debug!("Ignoring session cookie: {e}");
                None
            }
        }
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        let max_age = time::Duration::seconds(self.ttl.num_seconds());
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookie)
            .same_site(SameSite::Lax)
            .max_age(max_age)
            .build()
    }

    pub fn removal_cookie() -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, "")).path("/").removal().build()
    }
}
