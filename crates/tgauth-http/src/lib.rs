//! hyper service exposing init-data verification over HTTP.
//!
//! This crate is the calling side of [`tgauth_verify`]: it picks the init data
//! out of a request, caps its length, runs the verifier and maps the outcome
//! onto an HTTP response.
//!
//! - **Service** ([`service`]): [`AuthHttpService`](service::AuthHttpService), the
//!   hyper `Service` tying routing, transport selection and verification together.
//! - **Transport** ([`transport`]): Where the init data is read from (header,
//!   query string, JSON body).
//! - **Response** ([`response`]): JSON bodies for principals, errors and health
//!   probes.
//! - **Body** ([`body`]): The [`AuthResponseBody`](body::AuthResponseBody) type.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> AuthHttpService (hyper Service)
//!     -> Health probe interception
//!     -> Route check (/auth/verify, /auth/me)
//!     -> Init data lookup (x-tg-initdata header, initData query, JSON body)
//!     -> Length cap
//!     -> InitDataVerifier::verify
//!     -> Principal JSON, or {"error": reason_code}
//!     -> Common response headers (x-request-id)
//!   <- HTTP Response
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use tgauth_http::service::{AuthHttpConfig, AuthHttpService};
//! use tgauth_verify::{CredentialSet, InitDataVerifier};
//!
//! let credentials = CredentialSet::from_primary_and_csv(Some("123456:token"), "");
//! let verifier = InitDataVerifier::with_defaults(credentials);
//! let service = AuthHttpService::new(verifier, AuthHttpConfig::default());
//! // Use `service` with hyper server.
//! ```

pub mod body;
pub mod response;
pub mod service;
pub mod transport;

pub use body::AuthResponseBody;
pub use service::{AuthHttpConfig, AuthHttpService};
pub use transport::InitDataSource;
