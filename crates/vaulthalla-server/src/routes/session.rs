//! Session probe route.
//!
//! The dashboard's routing guard calls `GET /api/auth/session` before
//! rendering a protected page. The probe forwards the caller's session
//! cookie to the upstream origin and answers 401 unless the origin accepts
//! it, in which case the origin's JSON body is echoed verbatim.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::state::AppState;

/// Build the session router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/session", get(probe_session))
}

async fn probe_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let Some(session) = cookie_value(&headers, &state.session_cookie) else {
        debug!(cookie = %state.session_cookie, "no session cookie on request");
        return Err(AppError::Unauthorized("no session cookie".to_owned()));
    };

    let resp = state
        .http
        .get(&state.session_endpoint)
        .header(
            reqwest::header::COOKIE,
            format!("{}={session}", state.session_cookie),
        )
        .send()
        .await
        .map_err(|e| {
            warn!(url = %state.session_endpoint, error = %e, "session upstream unreachable");
            AppError::Unauthorized("session could not be verified".to_owned())
        })?;

    if !resp.status().is_success() {
        let status = resp.status();
        debug!(status = %status, "upstream rejected session");
        return Err(AppError::Unauthorized(format!(
            "session rejected by upstream ({status})"
        )));
    }

    let body: Value = resp.json().await.map_err(|e| {
        warn!(error = %e, "upstream session response is not JSON");
        AppError::Unauthorized("session could not be verified".to_owned())
    })?;
    Ok(Json(body))
}

/// Value of cookie `name` across all `Cookie` headers, if present and non-empty.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(cookies: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for c in cookies {
            map.append(COOKIE, HeaderValue::from_str(c).unwrap());
        }
        map
    }

    #[test]
    fn finds_cookie_among_others() {
        let h = headers(&["theme=dark; refresh=abc123; lang=en"]);
        assert_eq!(cookie_value(&h, "refresh"), Some("abc123"));
    }

    #[test]
    fn searches_every_cookie_header() {
        let h = headers(&["theme=dark", "refresh=xyz"]);
        assert_eq!(cookie_value(&h, "refresh"), Some("xyz"));
    }

    #[test]
    fn name_must_match_exactly() {
        let h = headers(&["refresh_token=abc; xrefresh=def"]);
        assert_eq!(cookie_value(&h, "refresh"), None);
    }

    #[test]
    fn empty_value_counts_as_missing() {
        assert_eq!(cookie_value(&headers(&["refresh="]), "refresh"), None);
        assert_eq!(cookie_value(&HeaderMap::new(), "refresh"), None);
    }

    #[test]
    fn strips_quotes() {
        let h = headers(&["refresh=\"quoted\""]);
        assert_eq!(cookie_value(&h, "refresh"), Some("quoted"));
    }
}
