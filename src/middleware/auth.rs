use axum::{
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{models::CurrentUser, AppState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    // user id issued by the identity provider
    pub sub: String,
    // expiry (unix timestamp seconds)
    pub exp: usize,
    // set by the identity provider for catalog moderators
    #[serde(default)]
    pub admin: bool,
}

fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;

    for part in raw.split(';') {
        let part = part.trim();
        let mut it = part.splitn(2, '=');
        let k = it.next()?.trim();
        let v = it.next()?.trim();
        if k == name {
            return Some(v.to_string());
        }
    }
    None
}

fn get_bearer(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Verifies an HS256 token and returns the user it was issued for.
pub fn verify_token(token: &str, secret: &str) -> Option<CurrentUser> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation).ok()?;
    if data.claims.sub.trim().is_empty() {
        return None;
    }
    let user = if data.claims.admin {
        CurrentUser::admin(data.claims.sub)
    } else {
        CurrentUser::new(data.claims.sub)
    };
    Some(user)
}

pub async fn inject_current_user(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = get_bearer(req.headers())
        .or_else(|| get_cookie(req.headers(), &state.settings.jwt_cookie_name));

    if let Some(user) = token.and_then(|t| verify_token(&t, &state.settings.jwt_secret)) {
        // Store user in request extensions so handlers can access it
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}

fn is_public_path(path: &str) -> bool {
    path == "/health" || path == "/health/db"
}

pub async fn require_auth(
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if is_public_path(req.uri().path()) {
        return next.run(req).await;
    }

    // If inject_current_user already put CurrentUser in extensions => authenticated
    if req.extensions().get::<CurrentUser>().is_some() {
        return next.run(req).await;
    }

    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "not authenticated" }))).into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn cookie_lookup_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; auth=abc.def; x=1"));

        assert_eq!(get_cookie(&headers, "auth").as_deref(), Some("abc.def"));
        assert_eq!(get_cookie(&headers, "missing"), None);
    }

    #[test]
    fn bearer_requires_scheme_and_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(get_bearer(&headers).as_deref(), Some("tok"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic tok"));
        assert_eq!(get_bearer(&headers), None);
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verify_token("not-a-jwt", "secret").is_none());
    }

    #[test]
    fn admin_claim_marks_the_user() {
        let claims = Claims {
            sub: "mod-1".to_string(),
            exp: (chrono::Utc::now().timestamp() + 600) as usize,
            admin: true,
        };
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        let user = verify_token(&token, "secret").unwrap();
        assert_eq!(user.id.as_str(), "mod-1");
        assert!(user.is_admin);
    }
}
