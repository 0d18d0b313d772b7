use axum::{extract::Request, middleware::Next, response::Response, Extension};
use tower_cookies::{Cookie, Cookies, Key};

use super::storage_error_response;
use crate::storage::{SharedStorage, DEMO_USER_ID};

pub const SESSION_COOKIE: &str = "mindease_user";

/// Builds the cookie-signing key. Without a usable secret a random key is
/// generated, so sessions do not survive a restart.
pub fn session_key(secret: Option<&str>) -> Key {
    match secret.map(|s| Key::try_from(s.as_bytes())) {
        Some(Ok(key)) => key,
        Some(Err(e)) => {
            tracing::warn!("SESSION_SECRET rejected ({}); using a random session key", e);
            Key::generate()
        }
        None => {
            tracing::warn!("SESSION_SECRET not set; using a random session key");
            Key::generate()
        }
    }
}

/// Resolves the acting user from the signed session cookie and exposes it
/// to handlers as `Extension<i32>`.
///
/// Unsigned or tampered cookies are ignored. A cookie naming a user that no
/// longer exists is removed. Both fall back to the demo account.
pub async fn current_user(
    Extension(storage): Extension<SharedStorage>,
    Extension(key): Extension<Key>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response {
    let session = cookies.signed(&key);
    let claimed = session
        .get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse::<i32>().ok());

    let user_id = match claimed {
        None => DEMO_USER_ID,
        Some(id) => match storage.get_user(id).await {
            Ok(Some(user)) => user.id,
            Ok(None) => {
                tracing::warn!("Session cookie names unknown user_id={}; clearing it", id);
                let mut stale = Cookie::new(SESSION_COOKIE, "");
                stale.set_path("/");
                session.remove(stale);
                DEMO_USER_ID
            }
            Err(e) => return storage_error_response("resolve_session", e),
        },
    };

    tracing::Span::current().record("user_id", user_id);
    request.extensions_mut().insert(user_id);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_secret_falls_back_to_random_key() {
        let a = session_key(Some("too-short"));
        let b = session_key(Some("too-short"));
        assert_ne!(a.master(), b.master());
    }

    #[test]
    fn test_long_secret_is_deterministic() {
        let secret = "x".repeat(64);
        let a = session_key(Some(&secret));
        let b = session_key(Some(&secret));
        assert_eq!(a.master(), b.master());
    }
}
