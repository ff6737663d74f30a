// SPDX-License-Identifier: Apache-2.0

//! Authentication middleware: HTTP Basic or `X-Auth-Token` session lookup, gated by the
//! public-path allow-list from §4.4.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::context::VmContext;

/// Paths reachable without credentials: service root, the three top-level collections, and the
/// `SessionService` root (so a client can discover how to log in).
fn is_public(path: &str) -> bool {
    path == "/redfish/v1/"
        || path == "/redfish/v1"
        || path == "/redfish/v1/Systems"
        || path == "/redfish/v1/Managers"
        || path == "/redfish/v1/Chassis"
        || path == "/redfish/v1/SessionService"
        || path == "/redfish/v1/SessionService/Sessions"
}

/// axum middleware enforcing §4.4's authentication rule. Runs before routing reaches a handler;
/// a request to a protected path without valid credentials never executes handler logic.
pub async fn require_auth(
    State(context): State<VmContext>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    // POST to Sessions (login) is itself public; it is the mechanism for obtaining a token.
    if is_public(path) {
        return next.run(request).await;
    }

    if let Some(token) = request
        .headers()
        .get("x-auth-token")
        .and_then(|value| value.to_str().ok())
    {
        if context.sessions.touch(token).await.is_some() {
            return next.run(request).await;
        }
        return unauthorized();
    }

    if let Some(auth_header) = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        if let Some(encoded) = auth_header.strip_prefix("Basic ") {
            if let Some((user, password)) = decode_basic(encoded) {
                let vm = context.vm();
                if user == vm.redfish_user && password == vm.redfish_password {
                    return next.run(request).await;
                }
            }
        }
    }

    unauthorized()
}

fn decode_basic(encoded: &str) -> Option<(String, String)> {
    let decoded = BASE64.decode(encoded).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (user, password) = text.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [("www-authenticate", "Basic realm=\"redfish\"")],
        "authentication required",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_paths_allow_list_matches_spec() {
        assert!(is_public("/redfish/v1/"));
        assert!(is_public("/redfish/v1/Systems"));
        assert!(is_public("/redfish/v1/SessionService"));
        assert!(!is_public("/redfish/v1/Systems/worker-1"));
        assert!(!is_public("/redfish/v1/UpdateService"));
    }

    #[test]
    fn basic_header_round_trips() {
        let encoded = BASE64.encode(b"admin:password");
        let (user, password) = decode_basic(&encoded).unwrap();
        assert_eq!(user, "admin");
        assert_eq!(password, "password");
    }
}
