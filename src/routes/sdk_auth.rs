use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

use crate::state::AppState;

const SDK_KEY_PREFIX: &str = "sdk_";
const SDK_KEY_RANDOM_LEN: usize = 32;

/// A freshly issued SDK key and the hash to configure as `SDK_KEY_HASH`.
pub struct IssuedSdkKey {
    pub key: String,
    pub hash: String,
}

/// Issues a new SDK key: `sdk_` followed by random alphanumerics, hashed for storage.
///
/// Only the hash is kept by the service; the key is shown to the operator once.
pub fn issue_sdk_key() -> Result<IssuedSdkKey, argon2::password_hash::Error> {
    let random: String = OsRng
        .sample_iter(&Alphanumeric)
        .take(SDK_KEY_RANDOM_LEN)
        .map(char::from)
        .collect();
    let key = format!("{SDK_KEY_PREFIX}{random}");
    let hash = hash_sdk_key(&key)?;
    Ok(IssuedSdkKey { key, hash })
}

/// Hashes an SDK key with Argon2 for the `SDK_KEY_HASH` setting.
pub fn hash_sdk_key(key: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(key.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

/// Verifies an SDK key against a stored hash.
pub fn verify_sdk_key(key: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(key.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Middleware to validate the X-SDK-Key header when an SDK key is configured
pub async fn require_sdk_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    let Some(expected_hash) = state.sdk_key_hash.clone() else {
        return Ok(next.run(req).await);
    };

    // Get SDK key from X-SDK-Key header
    let sdk_key = match req.headers().get("x-sdk-key").and_then(|v| v.to_str().ok()) {
        Some(key) => key.to_string(),
        None => {
            return Err((StatusCode::UNAUTHORIZED, "Missing X-SDK-Key header"));
        }
    };

    // Argon2 verification is CPU-bound
    let verified =
        tokio::task::spawn_blocking(move || verify_sdk_key(&sdk_key, &expected_hash)).await;

    match verified {
        Ok(Ok(true)) => Ok(next.run(req).await),
        Ok(Ok(false)) => Err((StatusCode::UNAUTHORIZED, "Invalid SDK key")),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Configured SDK key hash is malformed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "SDK key verification failed"))
        }
        Err(e) => {
            tracing::error!(error = %e, "SDK key verification task failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "SDK key verification failed"))
        }
    }
}
