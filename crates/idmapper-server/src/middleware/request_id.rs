//! `x-request-id` assignment.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Request, Response},
};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use uuid::Uuid;

/// Header name for request ID.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Reads the request ID from `headers`.
pub fn request_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(&REQUEST_ID_HEADER).and_then(|v| v.to_str().ok())
}

/// Layer that gives every request an ID and echoes it in the response.
#[derive(Clone, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdMiddleware { inner }
    }
}

/// Keeps an incoming, valid `x-request-id`; otherwise generates a UUIDv7.
#[derive(Clone)]
pub struct RequestIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestIdMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let value = match request.headers().get(&REQUEST_ID_HEADER) {
            Some(existing) if !existing.is_empty() && existing.to_str().is_ok() => existing.clone(),
            _ => {
                let generated = HeaderValue::from_str(&Uuid::now_v7().to_string());
                match generated {
                    Ok(value) => value,
                    Err(_) => HeaderValue::from_static("unknown"),
                }
            },
        };

        request
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), value.clone());

        let mut inner = self.inner.clone();

        Box::pin(async move {
            let mut response = inner.call(request).await?;
            response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
            Ok(response)
        })
    }
}
