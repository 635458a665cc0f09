//! Fehlertypen fuer das Datenbank-Crate

use thiserror::Error;

/// Datenbank-Fehlertypen
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Datensatz nicht gefunden: {0}")]
    NichtGefunden(String),

    #[error("Eindeutigkeitsverletzung: {0}")]
    Eindeutigkeit(String),

    #[error("Fremdschluessel verletzt: {0}")]
    Fremdschluessel(String),

    #[error("Ungueltige Daten: {0}")]
    UngueltigeDaten(String),

    #[error("SQLx-Fehler: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration-Fehler: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    pub fn nicht_gefunden(msg: impl Into<String>) -> Self {
        Self::NichtGefunden(msg.into())
    }

    pub fn ungueltige_daten(msg: impl Into<String>) -> Self {
        Self::UngueltigeDaten(msg.into())
    }

    /// Ordnet Constraint-Verletzungen von SQLite den passenden Varianten zu
    pub(crate) fn aus_sqlx(e: sqlx::Error, kontext: impl Into<String>) -> Self {
        let msg = e.to_string();
        if msg.contains("FOREIGN KEY") {
            Self::Fremdschluessel(kontext.into())
        } else if msg.contains("UNIQUE") || msg.contains("unique") {
            Self::Eindeutigkeit(kontext.into())
        } else {
            Self::Sqlx(e)
        }
    }

    /// Gibt true zurueck wenn es sich um einen Eindeutigkeitsfehler handelt
    pub fn ist_eindeutigkeit(&self) -> bool {
        matches!(self, Self::Eindeutigkeit(_))
            || matches!(self, Self::Sqlx(e) if {
                let msg = e.to_string();
                msg.contains("UNIQUE") || msg.contains("unique")
            })
    }
}
