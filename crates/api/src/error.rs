//! Fehlertypen der REST-API
//!
//! Validierungsfehler (fehlendes oder ungueltiges Feld) werden strikt von
//! Speicherfehlern (Verbindung, Constraint) getrennt.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use labcast_db::DbError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Ungueltige Eingabe: {0}")]
    Validierung(String),

    #[error("Nicht gefunden: {0}")]
    NichtGefunden(String),

    #[error("Konflikt: {0}")]
    Konflikt(String),

    #[error("Identitaets-Verzeichnis nicht erreichbar: {0}")]
    Upstream(String),

    #[error("Identitaets-Verzeichnis nicht konfiguriert")]
    NichtKonfiguriert,

    #[error("Speicherfehler: {0}")]
    Speicher(DbError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validierung(msg: impl Into<String>) -> Self {
        Self::Validierung(msg.into())
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Validierung(_) => StatusCode::BAD_REQUEST,
            Self::NichtGefunden(_) => StatusCode::NOT_FOUND,
            Self::Konflikt(_) => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::NichtKonfiguriert => StatusCode::SERVICE_UNAVAILABLE,
            Self::Speicher(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn ist_validierung(&self) -> bool {
        matches!(self, Self::Validierung(_))
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Eindeutigkeit(msg) => Self::Konflikt(msg),
            DbError::Fremdschluessel(msg) => Self::NichtGefunden(msg),
            andere => Self::Speicher(andere),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::Validierung(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            tracing::error!(fehler = %self, "Anfrage fehlgeschlagen");
        }
        (
            status,
            Json(json!({ "error": { "code": status.as_u16(), "message": self.to_string() } })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuscodes() {
        assert_eq!(ApiError::validierung("x").http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Upstream("x".into()).http_status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ApiError::from(DbError::ungueltige_daten("kaputt")).http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(DbError::nicht_gefunden("Ankuendigung")).http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn constraint_fehler_werden_zugeordnet() {
        assert!(matches!(
            ApiError::from(DbError::Eindeutigkeit("EMP1".into())),
            ApiError::Konflikt(_)
        ));
        assert!(matches!(
            ApiError::from(DbError::Fremdschluessel("venue:9".into())),
            ApiError::NichtGefunden(_)
        ));
        assert!(ApiError::validierung("x").ist_validierung());
    }
}
