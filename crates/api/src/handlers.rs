//! REST-Handler
//!
//! Jeder Handler reicht an die [`Fassade`](crate::Fassade) weiter und baut
//! daraus `(StatusCode, Json)`. Fehler werden ueber [`ApiError`] zu
//! `{ "error": { "code", "message" } }`.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use labcast_db::models::ProtokollErgebnis;
use serde::Deserialize;
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::fassade::{
    AnkuendigungEingabe, AnwesenheitEingabe, FingerabdruckEingabe, GeraetEingabe, VenueEingabe,
    ZuweisungEingabe,
};
use crate::ApiState;

/// JSON-Body; Syntax- und Typfehler werden zu 400
type Koerper<T> = Result<Json<T>, JsonRejection>;

// ---------------------------------------------------------------------------
// Geraete
// ---------------------------------------------------------------------------

pub async fn geraete_auflisten(State(state): State<ApiState>) -> ApiResult<Response> {
    let geraete = state.fassade.geraete_auflisten().await?;
    Ok((StatusCode::OK, Json(geraete)).into_response())
}

pub async fn geraet_registrieren(
    State(state): State<ApiState>,
    body: Koerper<GeraetEingabe>,
) -> ApiResult<Response> {
    let Json(eingabe) = body?;
    let geraet = state.fassade.geraet_registrieren(&eingabe).await?;
    Ok((StatusCode::CREATED, Json(geraet)).into_response())
}

pub async fn geraet_entfernen(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    state.fassade.geraet_entfernen(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// ---------------------------------------------------------------------------
// Raeume
// ---------------------------------------------------------------------------

pub async fn venues_auflisten(State(state): State<ApiState>) -> ApiResult<Response> {
    let venues = state.fassade.venues_auflisten().await?;
    Ok((StatusCode::OK, Json(venues)).into_response())
}

pub async fn venue_anlegen(
    State(state): State<ApiState>,
    body: Koerper<VenueEingabe>,
) -> ApiResult<Response> {
    let Json(eingabe) = body?;
    let venue = state.fassade.venue_anlegen(&eingabe).await?;
    Ok((StatusCode::CREATED, Json(venue)).into_response())
}

pub async fn zuweisungen_auflisten(State(state): State<ApiState>) -> ApiResult<Response> {
    let zuweisungen = state.fassade.zuweisungen_auflisten().await?;
    Ok((StatusCode::OK, Json(zuweisungen)).into_response())
}

pub async fn venue_zuweisen(
    State(state): State<ApiState>,
    body: Koerper<ZuweisungEingabe>,
) -> ApiResult<Response> {
    let Json(eingabe) = body?;
    let (ergebnis, zuweisung) = state.fassade.venue_zuweisen(&eingabe).await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "result": ergebnis, "assignment": zuweisung })),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Ankuendigung
// ---------------------------------------------------------------------------

pub async fn ankuendigung_lesen(State(state): State<ApiState>) -> ApiResult<Response> {
    let ankuendigung = state.fassade.ankuendigung_lesen().await?;
    Ok((StatusCode::OK, Json(ankuendigung)).into_response())
}

pub async fn ankuendigung_setzen(
    State(state): State<ApiState>,
    body: Koerper<AnkuendigungEingabe>,
) -> ApiResult<Response> {
    let Json(eingabe) = body?;
    let ankuendigung = state.fassade.ankuendigung_setzen(&eingabe).await?;
    Ok((StatusCode::OK, Json(ankuendigung)).into_response())
}

// ---------------------------------------------------------------------------
// Anwesenheit
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AnwesenheitFilter {
    #[serde(rename = "labName")]
    pub lab_name: Option<String>,
    pub limit: Option<i64>,
}

/// 201 wenn eingefuegt, 200 wenn innerhalb des Fensters bereits vorhanden
pub async fn anwesenheit_protokollieren(
    State(state): State<ApiState>,
    body: Koerper<AnwesenheitEingabe>,
) -> ApiResult<Response> {
    let Json(eingabe) = body?;
    let antwort = match state.fassade.anwesenheit_protokollieren(&eingabe).await? {
        ProtokollErgebnis::Eingefuegt(eintrag) => (
            StatusCode::CREATED,
            Json(json!({ "inserted": true, "entry": eintrag })),
        ),
        ProtokollErgebnis::Duplikat(vorhanden) => (
            StatusCode::OK,
            Json(json!({
                "inserted": false,
                "message": "Attendance already logged within the last minute",
                "entry": vorhanden
            })),
        ),
    };
    Ok(antwort.into_response())
}

pub async fn anwesenheit_auflisten(
    State(state): State<ApiState>,
    Query(filter): Query<AnwesenheitFilter>,
) -> ApiResult<Response> {
    let eintraege = state
        .fassade
        .anwesenheit_auflisten(filter.lab_name.as_deref(), filter.limit)
        .await?;
    Ok((StatusCode::OK, Json(eintraege)).into_response())
}

// ---------------------------------------------------------------------------
// Fingerabdruecke
// ---------------------------------------------------------------------------

pub async fn fingerabdruecke_auflisten(State(state): State<ApiState>) -> ApiResult<Response> {
    let vorlagen = state.fassade.fingerabdruecke_auflisten().await?;
    Ok((StatusCode::OK, Json(vorlagen)).into_response())
}

pub async fn fingerabdruck_anlegen(
    State(state): State<ApiState>,
    body: Koerper<FingerabdruckEingabe>,
) -> ApiResult<Response> {
    let Json(eingabe) = body?;
    let vorlage = state.fassade.fingerabdruck_anlegen(&eingabe).await?;
    Ok((StatusCode::CREATED, Json(vorlage)).into_response())
}

// ---------------------------------------------------------------------------
// Identitaet
// ---------------------------------------------------------------------------

pub async fn identitaet_abfragen(
    State(state): State<ApiState>,
    Path(uid): Path<String>,
) -> ApiResult<Response> {
    let proxy = state.identitaet.as_ref().ok_or(ApiError::NichtKonfiguriert)?;
    let antwort = proxy.abfragen(&uid).await?;

    let mut response = Response::new(Body::from(antwort.body));
    *response.status_mut() = antwort.status;
    if let Some(ct) = antwort.content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, ct);
    }
    Ok(response)
}
