use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{rejection::JsonRejection, Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower_cookies::{Cookie, Cookies, Key};

use super::middleware::SESSION_COOKIE;
use super::{error_response, json_body, storage_error_response};
use crate::models::NewUser;
use crate::storage::SharedStorage;

pub const MIN_PASSWORD_LEN: usize = 8;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// False for a wrong password and for an unparseable stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

#[derive(serde::Deserialize)]
pub struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

pub async fn register(
    Extension(storage): Extension<SharedStorage>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    let payload = match json_body(payload) {
        Ok(p) => p,
        Err(response) => return response,
    };

    let name = payload.name.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Name and email are required");
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters",
        );
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("Failed to hash password: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password");
        }
    };

    match storage
        .create_user(NewUser { name, email, password_hash: Some(password_hash) })
        .await
    {
        Ok(user) => {
            tracing::Span::current()
                .record("table", "users")
                .record("action", "register_user")
                .record("user_id", user.id)
                .record("business_event", "User registered successfully");

            crate::metrics::increment_users();
            (StatusCode::CREATED, Json(user)).into_response()
        }
        Err(e) => {
            tracing::Span::current().record("table", "users");
            storage_error_response("register_user_failed", e)
        }
    }
}

#[derive(serde::Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

pub async fn login(
    Extension(storage): Extension<SharedStorage>,
    Extension(key): Extension<Key>,
    cookies: Cookies,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let payload = match json_body(payload) {
        Ok(p) => p,
        Err(response) => return response,
    };

    let email = payload.email.trim().to_lowercase();
    let user = match storage.get_user_by_email(&email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            tracing::Span::current()
                .record("table", "users")
                .record("action", "login_user_failed")
                .record("error", "unknown_email");
            return error_response(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS);
        }
        Err(e) => return storage_error_response("login_user", e),
    };

    // Accounts without a hash (the demo user) cannot log in.
    let verified = user
        .password_hash
        .as_deref()
        .is_some_and(|hash| verify_password(&payload.password, hash));
    if !verified {
        tracing::Span::current()
            .record("table", "users")
            .record("action", "login_user_failed")
            .record("user_id", user.id)
            .record("error", "invalid_credentials");
        return error_response(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS);
    }

    let mut cookie = Cookie::new(SESSION_COOKIE, user.id.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookies.signed(&key).add(cookie);

    tracing::Span::current()
        .record("table", "users")
        .record("action", "login_user")
        .record("user_id", user.id)
        .record("business_event", "User logged in successfully");

    (StatusCode::OK, Json(user)).into_response()
}
