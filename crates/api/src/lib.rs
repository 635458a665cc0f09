//! labcast-api – REST-Schnittstelle der Lab-Anzeigen
//!
//! Die [`Fassade`] kapselt den Zustandsspeicher (Raumzuweisung,
//! Ankuendigung, Anwesenheit, Geraete) und trennt Validierungsfehler von
//! Speicherfehlern. Der [`RestServer`] stellt sie per Axum bereit, zusammen
//! mit der Durchreichung zum Identitaets-Verzeichnis und `/health`.

pub mod error;
pub mod fassade;
pub mod handlers;
pub mod identitaet;
pub mod routes;
pub mod server;

use std::sync::Arc;

pub use error::{ApiError, ApiResult};
pub use fassade::{Fassade, UhrFn};
pub use identitaet::{IdentitaetKonfig, IdentitaetsProxy};
pub use server::{RestServer, RestServerKonfig};

/// Axum-State fuer alle Handler
#[derive(Clone)]
pub struct ApiState {
    pub fassade: Arc<Fassade>,
    /// `None` wenn kein Verzeichnis konfiguriert ist
    pub identitaet: Option<Arc<IdentitaetsProxy>>,
}

impl ApiState {
    pub fn neu(fassade: Fassade, identitaet: Option<IdentitaetsProxy>) -> Self {
        Self {
            fassade: Arc::new(fassade),
            identitaet: identitaet.map(Arc::new),
        }
    }
}
