//! Health-Check-Endpunkt fuer Labcast
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime, DB-Status und der Zahl der
//! verbundenen Abonnenten pro Broadcast-Endpunkt.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub db_connected: bool,
    /// Verbundene Abonnenten je Endpunkt-Name
    pub subscribers: BTreeMap<String, usize>,
}

type Zaehler = Arc<dyn Fn() -> usize + Send + Sync>;

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    start_time: Arc<Instant>,
    db_connected: Arc<AtomicBool>,
    endpunkte: Arc<RwLock<Vec<(String, Zaehler)>>>,
}

impl HealthState {
    pub fn neu() -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            db_connected: Arc::new(AtomicBool::new(true)),
            endpunkte: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn db_verbunden(&self) -> bool {
        self.db_connected.load(Ordering::Relaxed)
    }

    pub fn db_status_setzen(&self, verbunden: bool) {
        self.db_connected.store(verbunden, Ordering::Relaxed);
    }

    /// Meldet einen Broadcast-Endpunkt an
    ///
    /// `zaehler` wird bei jeder Health-Abfrage aufgerufen.
    pub fn endpunkt_registrieren(
        &self,
        name: impl Into<String>,
        zaehler: impl Fn() -> usize + Send + Sync + 'static,
    ) {
        self.endpunkte.write().push((name.into(), Arc::new(zaehler)));
    }

    /// Aktuelle Abonnentenzahl je Endpunkt
    pub fn abonnenten(&self) -> BTreeMap<String, usize> {
        self.endpunkte
            .read()
            .iter()
            .map(|(name, zaehler)| (name.clone(), zaehler()))
            .collect()
    }

    /// Baut die Antwort fuer `GET /health`
    pub fn antwort(&self) -> HealthResponse {
        let db_connected = self.db_verbunden();
        HealthResponse {
            status: if db_connected {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            db_connected,
            subscribers: self.abonnenten(),
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::neu()
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – 200 auch bei degraded (Probe soll nicht failen)
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.antwort()))
}
