//! Route-Definitionen fuer die REST-API

use axum::{
    routing::{delete, get},
    Router,
};

use crate::{handlers, ApiState};

/// Erstellt den vollstaendigen API-Router (ohne State)
pub fn api_router() -> Router<ApiState> {
    Router::new()
        // Geraete
        .route(
            "/devices",
            get(handlers::geraete_auflisten).post(handlers::geraet_registrieren),
        )
        .route("/devices/:id", delete(handlers::geraet_entfernen))
        // Raeume
        .route(
            "/venues",
            get(handlers::venues_auflisten).post(handlers::venue_anlegen),
        )
        .route(
            "/venue-assignments",
            get(handlers::zuweisungen_auflisten).put(handlers::venue_zuweisen),
        )
        // Ankuendigung
        .route(
            "/announcement",
            get(handlers::ankuendigung_lesen).put(handlers::ankuendigung_setzen),
        )
        // Anwesenheit
        .route(
            "/attendance-logs",
            get(handlers::anwesenheit_auflisten).post(handlers::anwesenheit_protokollieren),
        )
        // Fingerabdruecke
        .route(
            "/fingerprints",
            get(handlers::fingerabdruecke_auflisten).post(handlers::fingerabdruck_anlegen),
        )
        // Identitaets-Verzeichnis
        .route("/identity/:uid", get(handlers::identitaet_abfragen))
}
