//! The auth HTTP service implementing hyper's `Service` trait.
//!
//! [`AuthHttpService`] puts the verifier behind HTTP. It handles:
//!
//! 1. Health probes (`GET /health`, `GET /_health`)
//! 2. Routing of `/auth/verify` (alias `/auth/me`)
//! 3. Locating the init data (header, query, JSON body)
//! 4. The input length cap
//! 5. Verification and principal extraction
//! 6. Common response headers (`x-request-id`)

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http::header::HeaderValue;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::service::Service;
use tgauth_verify::InitDataVerifier;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::body::AuthResponseBody;
use crate::response::{error_response, health_response, principal_response};
use crate::transport::{self, InitDataSource};

/// Response header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Default cap on the length of the init data.
const DEFAULT_MAX_INPUT_BYTES: usize = 8192;

/// Default cap on the size of a request body.
const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Configuration for the auth HTTP service.
#[derive(Debug, Clone)]
pub struct AuthHttpConfig {
    /// Longest init data, in bytes, handed to the verifier.
    pub max_input_bytes: usize,
    /// Largest request body, in bytes, that is read.
    pub max_body_bytes: usize,
}

impl Default for AuthHttpConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// The auth HTTP service that implements hyper's `Service` trait.
///
/// Cheap to clone: the verifier and the configuration are shared.
#[derive(Debug, Clone)]
pub struct AuthHttpService {
    verifier: Arc<InitDataVerifier>,
    config: Arc<AuthHttpConfig>,
}

impl AuthHttpService {
    /// Create a new auth HTTP service.
    #[must_use]
    pub fn new(verifier: InitDataVerifier, config: AuthHttpConfig) -> Self {
        Self::from_shared(Arc::new(verifier), config)
    }

    /// Create a new auth HTTP service from a shared verifier.
    #[must_use]
    pub fn from_shared(verifier: Arc<InitDataVerifier>, config: AuthHttpConfig) -> Self {
        Self {
            verifier,
            config: Arc::new(config),
        }
    }
}

impl<B> Service<http::Request<B>> for AuthHttpService
where
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = http::Response<AuthResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let verifier = Arc::clone(&self.verifier);
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();

            let response = process_request(req, &verifier, &config, &request_id).await;

            Ok(add_common_headers(response, &request_id))
        })
    }
}

/// Routes served by [`AuthHttpService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Health,
    Verify,
    MethodNotAllowed,
    NotFound,
}

fn route(method: &http::Method, path: &str) -> Route {
    match path {
        "/health" | "/_health" => {
            if *method == http::Method::GET {
                Route::Health
            } else {
                Route::MethodNotAllowed
            }
        }
        "/auth/verify" | "/auth/me" => {
            if *method == http::Method::GET || *method == http::Method::POST {
                Route::Verify
            } else {
                Route::MethodNotAllowed
            }
        }
        _ => Route::NotFound,
    }
}

/// Process an incoming HTTP request through the auth pipeline.
async fn process_request<B>(
    req: http::Request<B>,
    verifier: &InitDataVerifier,
    config: &AuthHttpConfig,
    request_id: &str,
) -> http::Response<AuthResponseBody>
where
    B: http_body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let uri = req.uri().clone();
    debug!(%method, path = uri.path(), request_id, "processing auth request");

    match route(&method, uri.path()) {
        Route::Health => return health_response(verifier.credentials()),
        Route::MethodNotAllowed => {
            return error_response(StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed");
        }
        Route::NotFound => return error_response(StatusCode::NOT_FOUND, "not_found"),
        Route::Verify => {}
    }

    // 1. Locate the init data.
    let (parts, body) = req.into_parts();
    let mut found = transport::from_parts(&parts);
    if found.is_none() && transport::body_may_carry_init_data(&parts) {
        match collect_body(body, config.max_body_bytes).await {
            Ok(bytes) => {
                found = transport::from_json_body(&bytes).map(|v| (InitDataSource::Body, v));
            }
            Err(status) => {
                warn!(status = status.as_u16(), request_id, "failed to read request body");
                return error_response(status, "invalid_body");
            }
        }
    }

    let (source, init_data) = match found {
        Some((source, init_data)) => (Some(source), init_data),
        None => (None, String::new()),
    };

    // 2. Length cap.
    if init_data.len() > config.max_input_bytes {
        warn!(
            length = init_data.len(),
            limit = config.max_input_bytes,
            request_id,
            "init data exceeds length limit"
        );
        return error_response(StatusCode::PAYLOAD_TOO_LARGE, "init_data_too_large");
    }

    // 3. Verification.
    let verified = match verifier.verify(&init_data) {
        Ok(verified) => verified,
        Err(err) => {
            warn!(
                reason = err.reason_code(),
                source = source.map(InitDataSource::as_str),
                credentials = verifier.credentials().len(),
                request_id,
                "init data verification failed"
            );
            return error_response(StatusCode::UNAUTHORIZED, err.reason_code());
        }
    };

    // 4. Principal.
    let Some(principal) = verified.principal() else {
        warn!(
            claims_status = ?verified.claims_status,
            credential = %verified.fingerprint,
            request_id,
            "verified init data carries no usable principal"
        );
        return error_response(StatusCode::BAD_REQUEST, "no_user");
    };

    info!(
        user_id = principal.id,
        credential = %verified.fingerprint,
        form = %verified.form,
        source = source.map(InitDataSource::as_str),
        request_id,
        "init data verified"
    );

    principal_response(&principal, &verified)
}

/// Collect a request body of at most `limit` bytes.
async fn collect_body<B>(body: B, limit: usize) -> Result<Bytes, StatusCode>
where
    B: http_body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.is::<LengthLimitError>() => Err(StatusCode::PAYLOAD_TOO_LARGE),
        Err(_) => Err(StatusCode::BAD_REQUEST),
    }
}

/// Add common response headers to every response.
fn add_common_headers(
    mut response: http::Response<AuthResponseBody>,
    request_id: &str,
) -> http::Response<AuthResponseBody> {
    if let Ok(hv) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, hv);
    }
    response
}

#[cfg(test)]
mod tests {
    use http_body_util::Full;
    use tgauth_verify::signature::sign_init_data;
    use tgauth_verify::{Credential, CredentialSet};

    use super::*;

    const TOKEN: &str = "123456789:AAE-test-bot-token";
    const PAYLOAD: &str = "user=%7B%22id%22%3A42%2C%22first_name%22%3A%22Ann%22%7D&auth_date=1700000000";

    fn service() -> AuthHttpService {
        let credentials = CredentialSet::new([Credential::new(TOKEN)]);
        AuthHttpService::new(
            InitDataVerifier::with_defaults(credentials),
            AuthHttpConfig::default(),
        )
    }

    fn signed() -> String {
        sign_init_data(PAYLOAD, &Credential::new(TOKEN))
    }

    fn request(method: &str, uri: &str) -> http::request::Builder {
        http::Request::builder().method(method).uri(uri)
    }

    async fn send(
        service: &AuthHttpService,
        req: http::Request<Full<Bytes>>,
    ) -> (StatusCode, http::HeaderMap, serde_json::Value) {
        let response = service.call(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, serde_json::from_slice(&bytes).unwrap())
    }

    fn empty() -> Full<Bytes> {
        Full::new(Bytes::new())
    }

    #[test]
    fn test_should_route_requests() {
        assert_eq!(route(&http::Method::GET, "/health"), Route::Health);
        assert_eq!(route(&http::Method::GET, "/_health"), Route::Health);
        assert_eq!(route(&http::Method::POST, "/health"), Route::MethodNotAllowed);
        assert_eq!(route(&http::Method::POST, "/auth/verify"), Route::Verify);
        assert_eq!(route(&http::Method::GET, "/auth/me"), Route::Verify);
        assert_eq!(route(&http::Method::DELETE, "/auth/me"), Route::MethodNotAllowed);
        assert_eq!(route(&http::Method::GET, "/"), Route::NotFound);
    }

    #[test]
    fn test_should_create_default_config() {
        let config = AuthHttpConfig::default();
        assert_eq!(config.max_input_bytes, 8192);
        assert_eq!(config.max_body_bytes, 65536);
    }

    #[tokio::test]
    async fn test_should_verify_init_data_from_header() {
        let req = request("POST", "/auth/verify")
            .header("x-tg-initdata", signed())
            .body(empty())
            .unwrap();

        let (status, headers, body) = send(&service(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 42);
        assert_eq!(body["firstName"], "Ann");
        assert_eq!(body["claimsStatus"], "decoded");
        assert_eq!(body["credential"], "…-token");
        assert_eq!(body["form"], "raw");
        assert_eq!(body["authDate"], 1_700_000_000);
        assert!(headers.contains_key(REQUEST_ID_HEADER));
        assert_eq!(
            headers.get("content-type").and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
    }

    #[tokio::test]
    async fn test_should_verify_init_data_from_query() {
        let encoded: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("initData", &signed())
            .finish();
        let req = request("GET", &format!("/auth/me?{encoded}"))
            .body(empty())
            .unwrap();

        let (status, _, body) = send(&service(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 42);
    }

    #[tokio::test]
    async fn test_should_verify_init_data_from_json_body() {
        let json = serde_json::json!({ "initData": signed() }).to_string();
        let req = request("POST", "/auth/verify")
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(json)))
            .unwrap();

        let (status, _, body) = send(&service(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 42);
    }

    #[tokio::test]
    async fn test_should_ignore_body_of_get_request() {
        let json = serde_json::json!({ "initData": signed() }).to_string();
        let req = request("GET", "/auth/verify")
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(json)))
            .unwrap();

        let (status, _, body) = send(&service(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "missing_input");
    }

    #[tokio::test]
    async fn test_should_reject_tampered_init_data_with_reason_code() {
        let tampered = signed().replace("auth_date=1700000000", "auth_date=1700000001");
        let req = request("POST", "/auth/verify")
            .header("x-tg-initdata", tampered)
            .body(empty())
            .unwrap();

        let (status, _, body) = send(&service(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, serde_json::json!({"error": "invalid_signature"}));
    }

    #[tokio::test]
    async fn test_should_report_missing_signature() {
        let req = request("POST", "/auth/verify")
            .header("x-tg-initdata", PAYLOAD)
            .body(empty())
            .unwrap();

        let (status, _, body) = send(&service(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "missing_signature");
    }

    #[tokio::test]
    async fn test_should_report_missing_credential() {
        let service = AuthHttpService::new(
            InitDataVerifier::with_defaults(CredentialSet::default()),
            AuthHttpConfig::default(),
        );
        let req = request("POST", "/auth/verify")
            .header("x-tg-initdata", signed())
            .body(empty())
            .unwrap();

        let (status, _, body) = send(&service, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "missing_credential");
    }

    #[tokio::test]
    async fn test_should_reject_oversized_init_data() {
        let service = AuthHttpService::new(
            InitDataVerifier::with_defaults(CredentialSet::new([Credential::new(TOKEN)])),
            AuthHttpConfig {
                max_input_bytes: 16,
                ..AuthHttpConfig::default()
            },
        );
        let req = request("POST", "/auth/verify")
            .header("x-tg-initdata", signed())
            .body(empty())
            .unwrap();

        let (status, _, body) = send(&service, req).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "init_data_too_large");
    }

    #[tokio::test]
    async fn test_should_reject_oversized_body() {
        let service = AuthHttpService::new(
            InitDataVerifier::with_defaults(CredentialSet::new([Credential::new(TOKEN)])),
            AuthHttpConfig {
                max_body_bytes: 8,
                ..AuthHttpConfig::default()
            },
        );
        let json = serde_json::json!({ "initData": signed() }).to_string();
        let req = request("POST", "/auth/verify")
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(json)))
            .unwrap();

        let (status, _, body) = send(&service, req).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "invalid_body");
    }

    #[tokio::test]
    async fn test_should_answer_no_user_without_principal() {
        let signed = sign_init_data("auth_date=1700000000&query_id=AAH", &Credential::new(TOKEN));
        let req = request("POST", "/auth/verify")
            .header("x-tg-initdata", signed)
            .body(empty())
            .unwrap();

        let (status, _, body) = send(&service(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "no_user");
    }

    #[tokio::test]
    async fn test_should_serve_health_probe() {
        let req = request("GET", "/health").body(empty()).unwrap();
        let (status, headers, body) = send(&service(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["credentials"], 1);
        assert!(headers.contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_should_answer_not_found_and_method_not_allowed() {
        let (status, headers, body) =
            send(&service(), request("GET", "/nope").body(empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
        assert!(headers.contains_key(REQUEST_ID_HEADER));

        let (status, _, body) =
            send(&service(), request("PUT", "/auth/verify").body(empty()).unwrap()).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["error"], "method_not_allowed");
    }

    #[test]
    fn test_should_add_request_id_header() {
        let response = error_response(StatusCode::NOT_FOUND, "not_found");
        let response = add_common_headers(response, "test-request-id");
        assert_eq!(
            response
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok()),
            Some("test-request-id"),
        );
    }
}
