//! Axum HTTP-Server fuer die REST-API

use std::net::SocketAddr;

use anyhow::Result;
use axum::http::{HeaderValue, Method};
use axum::{middleware, Router};
use labcast_observability::{health_router, timing_middleware, HealthState};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes::api_router;
use crate::ApiState;

/// REST-Server-Konfiguration
#[derive(Debug, Clone)]
pub struct RestServerKonfig {
    pub bind_addr: SocketAddr,
    /// Erlaubte CORS-Origins. Leer = alle Origins erlaubt.
    pub cors_origins: Vec<String>,
}

impl Default for RestServerKonfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_origins: vec![],
        }
    }
}

/// Baut die komplette Anwendung: API-Routen, `/health`, Timing, Tracing, CORS
pub fn app(state: ApiState, health: HealthState, cors_origins: &[String]) -> Router {
    // Die Anzeigen laufen als lokale Web-Oberflaechen, daher standardmaessig offen
    let cors = if cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = cors_origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(tower_http::cors::Any)
    };

    api_router()
        .with_state(state)
        .merge(health_router(health))
        .layer(middleware::from_fn(timing_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub struct RestServer {
    listener: TcpListener,
    app: Router,
}

impl RestServer {
    /// Bindet den Listener. Port 0 waehlt einen freien Port.
    pub async fn binden(
        konfig: &RestServerKonfig,
        state: ApiState,
        health: HealthState,
    ) -> Result<Self> {
        let listener = TcpListener::bind(konfig.bind_addr).await?;
        Ok(Self {
            listener,
            app: app(state, health, &konfig.cors_origins),
        })
    }

    pub fn lokale_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Laeuft bis `shutdown_rx` auf `true` wechselt
    pub async fn starten(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let addr = self.listener.local_addr()?;
        tracing::info!(addr = %addr, "REST-API gestartet");

        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(async move {
                while !*shutdown_rx.borrow() {
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            })
            .await?;

        tracing::info!("REST-API beendet");
        Ok(())
    }
}
