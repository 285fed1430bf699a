//! Cache header middleware.
//! Runs the active [`CacheControlListener`] on every response.

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::{Body, Bytes, HttpBody},
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::listener::{request_head, CacheControlListener, Decision};
use crate::observability::metrics;

/// Handle to the listener currently in effect.
///
/// Cloned into every request; `replace` swaps in a freshly built listener
/// without disturbing in-flight requests.
#[derive(Clone)]
pub struct CacheControlState {
    listener: Arc<ArcSwap<CacheControlListener>>,
}

impl CacheControlState {
    pub fn new(listener: CacheControlListener) -> Self {
        Self {
            listener: Arc::new(ArcSwap::from_pointee(listener)),
        }
    }

    pub fn current(&self) -> Arc<CacheControlListener> {
        self.listener.load_full()
    }

    pub fn replace(&self, listener: CacheControlListener) {
        self.listener.store(Arc::new(listener));
    }
}

/// Buffers safe-method responses and applies the cache header rules.
///
/// Bodies whose size is unknown or above `max_body_bytes` stream through
/// untouched; their headers are still composed, without an ETag.
///
/// Mount with `axum::middleware::from_fn_with_state(state, cache_control_middleware)`.
pub async fn cache_control_middleware(
    State(state): State<CacheControlState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !CacheControlListener::is_cacheable_method(request.method()) {
        metrics::record_decision(Decision::UnsafeMethod.as_str());
        return next.run(request).await;
    }

    let listener = state.current();
    let head = request_head(&request);
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let limit = listener.max_body_bytes();
    let fits = body.size_hint().upper().is_some_and(|size| size <= limit as u64);

    if !fits {
        tracing::warn!(
            path = %head.uri().path(),
            limit,
            size = ?body.size_hint().upper(),
            "Response body not buffered, ETag skipped"
        );
        let mut shell = axum::http::Response::from_parts(parts, Bytes::new());
        listener.on_unbuffered_response(&head, &mut shell);
        let (parts, _) = shell.into_parts();
        return Response::from_parts(parts, body);
    }

    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(path = %head.uri().path(), error = %e, "Response body failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Response body failed").into_response();
        }
    };

    let mut buffered = axum::http::Response::from_parts(parts, bytes);
    listener.on_response(&head, &mut buffered);
    buffered.map(Body::from)
}
