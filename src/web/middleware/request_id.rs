//! Request correlation for the dashboard API.
//!
//! Each request runs inside a `request` span keyed by an ID. The dashboard
//! frontend may send its own `X-Request-Id`; a usable one is kept, anything
//! else is replaced by a fresh ULID. The resolved ID is echoed back.

use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::Response;
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tracing::{Instrument, debug, error, info, warn};

use crate::utils::fmt_duration;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Reuse the caller's ID when it is short, printable ASCII; otherwise mint one.
fn resolve_request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id.bytes().all(|b| b.is_ascii_graphic())
        })
        .map(String::from)
        .unwrap_or_else(|| ulid::Ulid::new().to_string())
}

/// Writes are always worth a line; successful reads only at debug.
fn log_completion(method: &Method, path: &str, status: StatusCode, elapsed: Duration) {
    let status_code = status.as_u16();
    let took = fmt_duration(elapsed);
    if status.is_server_error() {
        warn!(%method, path, status = status_code, took = %took, "request failed upstream");
    } else if status.is_client_error() || *method != Method::GET {
        info!(%method, path, status = status_code, took = %took, "request handled");
    } else {
        debug!(%method, path, status = status_code, took = %took, "request handled");
    }
}

#[derive(Clone)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, B> Service<Request> for RequestIdService<S>
where
    S: Service<Request, Response = Response<B>> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Debug,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let request_id = resolve_request_id(req.headers());
        let echoed = HeaderValue::from_str(&request_id).ok();
        let span = tracing::info_span!("request", request_id = %request_id);

        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        let started = Instant::now();
        let response = self.inner.call(req);

        Box::pin(
            async move {
                let mut result = response.await;
                match &mut result {
                    Ok(response) => {
                        log_completion(&method, &path, response.status(), started.elapsed());
                        if let Some(value) = echoed {
                            response.headers_mut().insert(REQUEST_ID_HEADER, value);
                        }
                    }
                    Err(err) => {
                        error!(%method, path = %path, error = ?err, "request errored before responding");
                    }
                }
                result
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(id).unwrap());
        headers
    }

    #[test]
    fn keeps_a_usable_caller_id() {
        assert_eq!(resolve_request_id(&headers(" dash-42 ")), "dash-42");
    }

    #[test]
    fn replaces_missing_or_unusable_ids() {
        let generated = resolve_request_id(&HeaderMap::new());
        assert!(generated.parse::<ulid::Ulid>().is_ok());

        let spaced = resolve_request_id(&headers("two words"));
        assert_ne!(spaced, "two words");
        assert!(spaced.parse::<ulid::Ulid>().is_ok());

        let long = "a".repeat(MAX_REQUEST_ID_LEN + 1);
        assert_ne!(resolve_request_id(&headers(&long)), long);
    }
}
