//! Request-Timing Middleware fuer Axum
//!
//! Misst die Antwortzeit jeder HTTP-Anfrage und protokolliert sie als
//! strukturiertes Log-Event.

use axum::{
    body::Body,
    http::{Request, Response},
    middleware::Next,
};
use std::time::Instant;

/// Axum-Middleware-Funktion: misst Antwortzeit und loggt strukturiert.
///
/// ```ignore
/// Router::new()
///     .route("/", get(handler))
///     .layer(axum::middleware::from_fn(timing_middleware))
/// ```
pub async fn timing_middleware(req: Request<Body>, next: Next) -> Response<Body> {
    let methode = req.method().clone();
    let pfad = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let dauer_ms = start.elapsed().as_millis() as u64;
    if status >= 500 {
        tracing::warn!(method = %methode, path = %pfad, status, dauer_ms, "HTTP-Anfrage fehlgeschlagen");
    } else {
        tracing::info!(method = %methode, path = %pfad, status, dauer_ms, "HTTP-Anfrage abgeschlossen");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn middleware_reicht_antwort_durch() {
        let app = Router::new()
            .route("/x", get(|| async { (StatusCode::ACCEPTED, "ok") }))
            .layer(axum::middleware::from_fn(timing_middleware));

        let antwort = app
            .oneshot(Request::get("/x").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::ACCEPTED);
    }
}
