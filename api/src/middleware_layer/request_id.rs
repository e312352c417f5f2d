//! `X-Request-Id` propagation: reuse the caller's id or mint one, run the
//! request inside a span carrying it, echo it on the response.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{Instrument, info_span};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn ensure_request_id(headers: &HeaderMap) -> String {
    if let Some(v) = headers.get(REQUEST_ID_HEADER).and_then(|h| h.to_str().ok()) {
        if !v.trim().is_empty() {
            return v.to_string();
        }
    }
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros() * 1000);
    format!("req-{nanos}")
}

pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let id = ensure_request_id(req.headers());
    let header = HeaderValue::from_str(&id).ok();
    if let Some(h) = &header {
        req.headers_mut().insert(REQUEST_ID_HEADER, h.clone());
    }

    let span = info_span!(
        "http",
        request_id = %id,
        method = %req.method(),
        path = %req.uri().path()
    );
    let mut res = next.run(req).instrument(span).await;

    if let Some(h) = header {
        res.headers_mut().insert(REQUEST_ID_HEADER, h);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_caller_id() {
        let mut h = HeaderMap::new();
        h.insert(REQUEST_ID_HEADER, HeaderValue::from_static("abc-1"));
        assert_eq!(ensure_request_id(&h), "abc-1");
    }

    #[test]
    fn mints_id_when_missing_or_blank() {
        let mut h = HeaderMap::new();
        assert!(ensure_request_id(&h).starts_with("req-"));
        h.insert(REQUEST_ID_HEADER, HeaderValue::from_static("  "));
        assert!(ensure_request_id(&h).starts_with("req-"));
    }
}
