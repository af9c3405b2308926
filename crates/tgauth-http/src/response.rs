//! JSON response construction.

use http::StatusCode;
use http::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderValue};
use tgauth_verify::{
    CanonicalForm, ClaimsStatus, Credential, CredentialFingerprint, CredentialSet, Principal,
    VerifiedInitData,
};
use tracing::error;

use crate::body::AuthResponseBody;

/// Error body: `{"error": "<code>"}`.
#[derive(Debug, serde::Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// Health probe body.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthBody {
    ok: bool,
    credentials: usize,
    primary_fingerprint: Option<CredentialFingerprint>,
}

/// Body returned for a verified principal.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct PrincipalBody<'a> {
    #[serde(flatten)]
    principal: &'a Principal,
    claims_status: ClaimsStatus,
    credential: &'a CredentialFingerprint,
    form: CanonicalForm,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth_date: Option<i64>,
}

/// Serialize `value` into a JSON response with the given status.
pub fn json_response<T: serde::Serialize + ?Sized>(
    status: StatusCode,
    value: &T,
) -> http::Response<AuthResponseBody> {
    match AuthResponseBody::json(value) {
        Ok(body) => build(status, body),
        Err(err) => {
            error!(error = %err, "failed to serialize response body");
            build(
                StatusCode::INTERNAL_SERVER_ERROR,
                AuthResponseBody::from_bytes(r#"{"error":"internal_error"}"#),
            )
        }
    }
}

/// `{"error": code}` with the given status.
pub fn error_response(status: StatusCode, code: &str) -> http::Response<AuthResponseBody> {
    json_response(status, &ErrorBody { error: code })
}

/// Health probe response: `200` with at least one credential, `503` without.
///
/// Only the number of credentials and the primary fingerprint are reported.
pub fn health_response(credentials: &CredentialSet) -> http::Response<AuthResponseBody> {
    let ok = !credentials.is_empty();
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    json_response(
        status,
        &HealthBody {
            ok,
            credentials: credentials.len(),
            primary_fingerprint: credentials.primary().map(Credential::fingerprint),
        },
    )
}

/// `200` with the principal and how it was verified.
pub fn principal_response(
    principal: &Principal,
    verified: &VerifiedInitData,
) -> http::Response<AuthResponseBody> {
    json_response(
        StatusCode::OK,
        &PrincipalBody {
            principal,
            claims_status: verified.claims_status,
            credential: &verified.fingerprint,
            form: verified.form,
            auth_date: verified.auth_date(),
        },
    )
}

fn build(status: StatusCode, body: AuthResponseBody) -> http::Response<AuthResponseBody> {
    let mut response = http::Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn body_json(response: http::Response<AuthResponseBody>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_should_build_error_response() {
        let response = error_response(StatusCode::UNAUTHORIZED, "invalid_signature");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "invalid_signature"})
        );
    }

    #[tokio::test]
    async fn test_should_report_healthy_with_primary_fingerprint() {
        let credentials = CredentialSet::new([
            Credential::new("123456789:AAE-very-secret-token"),
            Credential::new("987654321:AAE-older-token"),
        ]);
        let response = health_response(&credentials);
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(
            body,
            serde_json::json!({"ok": true, "credentials": 2, "primaryFingerprint": "…-token"})
        );
        assert!(!body.to_string().contains("secret"));
    }

    #[tokio::test]
    async fn test_should_report_unhealthy_without_credentials() {
        let response = health_response(&CredentialSet::default());
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"ok": false, "credentials": 0, "primaryFingerprint": null})
        );
    }
}
