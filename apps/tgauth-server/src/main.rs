//! tgauth Server - verifies signed Telegram init data over HTTP.
//!
//! This binary loads the credential set once at startup and serves the
//! [`AuthHttpService`] until it receives Ctrl-C, then drains in-flight
//! connections.
//!
//! # Usage
//!
//! ```text
//! TELEGRAM_BOT_TOKEN=123456:ABC GATEWAY_LISTEN=0.0.0.0:8080 tgauth-server
//! tgauth-server --health-check
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `TELEGRAM_BOT_TOKEN` | *(unset)* | Primary credential |
//! | `TELEGRAM_BOT_TOKENS_CSV` | *(empty)* | Rotation credentials, comma separated |
//! | `AUTH_SIGNATURE_FIELDS` | `hash,signature` | Accepted signature fields, preferred first |
//! | `AUTH_CLAIMS_FIELD` | `user` | Identity claims field |
//! | `AUTH_CANONICAL_FORMS` | `raw,decoded,canonical_json` | Canonical forms to try, in order |
//! | `AUTH_SECRET_DERIVATIONS` | `sha256` | Secret derivations to try, in order |
//! | `AUTH_MAX_INPUT_BYTES` | `8192` | Longest accepted init data |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::future::Future;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tgauth_core::{AuthConfig, TgAuthResult};
use tgauth_http::AuthHttpService;
use tgauth_verify::Credential;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the HTTP service, refusing an empty credential set.
fn build_service(config: &AuthConfig) -> TgAuthResult<AuthHttpService> {
    config.require_credentials()?;
    Ok(AuthHttpService::new(
        config.build_verifier(),
        config.http_config(),
    ))
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("received shutdown signal, draining connections");
}

async fn serve(
    listener: TcpListener,
    service: AuthHttpService,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Send a bodiless HTTP/1.1 request and return the raw response.
async fn fetch(addr: &str, request_line: &str, headers: &[(&str, &str)]) -> Result<String> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let extra: String = headers
        .iter()
        .map(|(name, value)| format!("{name}: {value}\r\n"))
        .collect();
    let request = format!(
        "{request_line} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n{extra}Content-Length: 0\r\n\r\n"
    );

    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;
    Ok(response)
}

async fn run_health_check(addr: &str) -> Result<()> {
    let response = fetch(addr, "GET /health", &[]).await?;

    // Healthy means at least one credential is loaded.
    if response.contains("200 OK") && response.contains("\"ok\":true") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AuthConfig::from_env().context("failed to load configuration")?;

    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;

    let service = match build_service(&config) {
        Ok(service) => service,
        Err(err) => {
            error!(error = %err, "refusing to start");
            return Err(err.into());
        }
    };

    if config.credentials.len() > 1 {
        info!(
            deprecated = config.credentials.len() - 1,
            "credential rotation active, non-primary credentials are still accepted"
        );
    }

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(
        %addr,
        credentials = config.credentials.len(),
        primary = ?config.credentials.primary().map(Credential::fingerprint),
        forms = ?config.verifier.canonical_forms,
        derivations = ?config.verifier.derivations,
        version = VERSION,
        "starting tgauth server",
    );

    serve(listener, service, shutdown_signal()).await
}
