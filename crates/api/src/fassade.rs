//! Zustandsspeicher-Fassade
//!
//! Validiert Eingaben und reicht sie an die Repositories weiter. Die beiden
//! Pruefen-dann-Schreiben-Operationen (Raumzuweisung, Anwesenheit) laufen
//! ohne gegenseitigen Ausschluss zwischen Anfragen.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use labcast_core::{DeviceId, VenueId};
use labcast_db::models::{
    AnkuendigungRecord, AnwesenheitRecord, FingerabdruckRecord, GeraetRecord,
    NeuerAnwesenheitsEintrag, NeuerFingerabdruck, NeuesGeraet, ProtokollErgebnis, VenueRecord,
    ZuweisungRecord, ZuweisungsErgebnis,
};
use labcast_db::{
    AnnouncementRepository, AttendanceRepository, DeviceRepository, FingerprintRepository,
    SqliteDb, VenueAssignmentRepository, VenueRepository,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

/// Funktor-Typ: liefert die aktuelle Zeit (in Tests austauschbar)
pub type UhrFn = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Standard-Limit fuer `GET /attendance-logs`
pub const STANDARD_LIMIT: i64 = 100;
/// Obergrenze fuer `GET /attendance-logs`
pub const MAX_LIMIT: i64 = 1000;

// ---------------------------------------------------------------------------
// Eingaben
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct GeraetEingabe {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VenueEingabe {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ZuweisungEingabe {
    #[serde(rename = "deviceID")]
    pub device_id: Option<i64>,
    #[serde(rename = "venueID")]
    pub venue_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnkuendigungEingabe {
    pub content: Option<String>,
    #[serde(rename = "isImage", default)]
    pub is_image: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnwesenheitEingabe {
    #[serde(rename = "studentID")]
    pub student_id: Option<String>,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    pub instructor: Option<String>,
    pub section: Option<String>,
    #[serde(rename = "labName")]
    pub lab_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FingerabdruckEingabe {
    #[serde(rename = "employeeNo")]
    pub employee_no: Option<String>,
    #[serde(rename = "fingerprintTemplate")]
    pub fingerprint_template: Option<String>,
}

/// Prueft ein Pflichtfeld: vorhanden und nach Trim nicht leer
fn pflichtfeld<'a>(wert: &'a Option<String>, feld: &str) -> ApiResult<&'a str> {
    match wert.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s),
        Some(_) => Err(ApiError::validierung(format!("Feld '{feld}' darf nicht leer sein"))),
        None => Err(ApiError::validierung(format!("Feld '{feld}' fehlt"))),
    }
}

fn positive_id(wert: Option<i64>, feld: &str) -> ApiResult<i64> {
    match wert {
        Some(id) if id > 0 => Ok(id),
        Some(id) => Err(ApiError::validierung(format!("Feld '{feld}' ungueltig: {id}"))),
        None => Err(ApiError::validierung(format!("Feld '{feld}' fehlt"))),
    }
}

fn base64_pruefen(wert: &str, feld: &str) -> ApiResult<()> {
    STANDARD
        .decode(wert)
        .map(|_| ())
        .map_err(|e| ApiError::validierung(format!("Feld '{feld}' ist kein gueltiges base64: {e}")))
}

// ---------------------------------------------------------------------------
// Fassade
// ---------------------------------------------------------------------------

pub struct Fassade {
    db: SqliteDb,
    uhr: UhrFn,
}

impl Fassade {
    pub fn neu(db: SqliteDb) -> Self {
        Self::mit_uhr(db, Arc::new(Utc::now))
    }

    pub fn mit_uhr(db: SqliteDb, uhr: UhrFn) -> Self {
        Self { db, uhr }
    }

    pub fn db(&self) -> &SqliteDb {
        &self.db
    }

    pub fn jetzt(&self) -> DateTime<Utc> {
        (self.uhr)()
    }

    // -- Geraete --------------------------------------------------------------

    pub async fn geraete_auflisten(&self) -> ApiResult<Vec<GeraetRecord>> {
        Ok(DeviceRepository::list(&self.db).await?)
    }

    pub async fn geraet_registrieren(&self, eingabe: &GeraetEingabe) -> ApiResult<GeraetRecord> {
        let name = pflichtfeld(&eingabe.name, "name")?;
        Ok(DeviceRepository::create(&self.db, NeuesGeraet { name }).await?)
    }

    pub async fn geraet_entfernen(&self, id: i64) -> ApiResult<()> {
        if DeviceRepository::delete(&self.db, DeviceId(id)).await? {
            tracing::info!(geraet = id, "Geraet entfernt");
            Ok(())
        } else {
            Err(ApiError::NichtGefunden(format!("Geraet {id}")))
        }
    }

    // -- Raeume ---------------------------------------------------------------

    pub async fn venues_auflisten(&self) -> ApiResult<Vec<VenueRecord>> {
        Ok(VenueRepository::list(&self.db).await?)
    }

    pub async fn venue_anlegen(&self, eingabe: &VenueEingabe) -> ApiResult<VenueRecord> {
        let name = pflichtfeld(&eingabe.name, "name")?;
        Ok(VenueRepository::create(&self.db, name).await?)
    }

    // -- Raumzuweisung --------------------------------------------------------

    pub async fn zuweisungen_auflisten(&self) -> ApiResult<Vec<ZuweisungRecord>> {
        Ok(VenueAssignmentRepository::list(&self.db).await?)
    }

    /// Existiert fuer das Geraet eine Zuweisung, wird sie aktualisiert,
    /// sonst angelegt.
    pub async fn venue_zuweisen(
        &self,
        eingabe: &ZuweisungEingabe,
    ) -> ApiResult<(ZuweisungsErgebnis, ZuweisungRecord)> {
        let device_id = DeviceId(positive_id(eingabe.device_id, "deviceID")?);
        let venue_id = VenueId(positive_id(eingabe.venue_id, "venueID")?);

        let ergebnis = self.db.assign(device_id, venue_id).await?;
        let zuweisung = VenueAssignmentRepository::get(&self.db, device_id)
            .await?
            .ok_or_else(|| ApiError::NichtGefunden(format!("Zuweisung fuer Geraet {device_id}")))?;

        tracing::info!(geraet = %device_id, venue = %venue_id, ergebnis = ?ergebnis, "Raum zugewiesen");
        Ok((ergebnis, zuweisung))
    }

    // -- Ankuendigung ---------------------------------------------------------

    pub async fn ankuendigung_lesen(&self) -> ApiResult<AnkuendigungRecord> {
        Ok(AnnouncementRepository::get(&self.db).await?)
    }

    /// Ueberschreibt die Ankuendigung. Bilder muessen base64 sein.
    pub async fn ankuendigung_setzen(
        &self,
        eingabe: &AnkuendigungEingabe,
    ) -> ApiResult<AnkuendigungRecord> {
        let content = eingabe
            .content
            .as_deref()
            .ok_or_else(|| ApiError::validierung("Feld 'content' fehlt"))?;
        if eingabe.is_image {
            if content.is_empty() {
                return Err(ApiError::validierung("Bild-Ankuendigung ohne Inhalt"));
            }
            base64_pruefen(content, "content")?;
        }

        let record = AnnouncementRepository::set(&self.db, content, eingabe.is_image).await?;
        tracing::info!(bild = eingabe.is_image, laenge = content.len(), "Ankuendigung gesetzt");
        Ok(record)
    }

    // -- Anwesenheit ----------------------------------------------------------

    /// Duplikat-geschuetztes Protokollieren. Ein Duplikat ist kein Fehler.
    pub async fn anwesenheit_protokollieren(
        &self,
        eingabe: &AnwesenheitEingabe,
    ) -> ApiResult<ProtokollErgebnis> {
        let eintrag = NeuerAnwesenheitsEintrag {
            student_id: pflichtfeld(&eingabe.student_id, "studentID")?,
            full_name: pflichtfeld(&eingabe.full_name, "fullName")?,
            instructor: pflichtfeld(&eingabe.instructor, "instructor")?,
            section: pflichtfeld(&eingabe.section, "section")?,
            lab_name: pflichtfeld(&eingabe.lab_name, "labName")?,
        };

        let ergebnis = self.db.log(eintrag, self.jetzt()).await?;
        if ergebnis.ist_duplikat() {
            tracing::debug!(student = %ergebnis.eintrag().student_id, "Anwesenheit innerhalb des Fensters, nicht eingefuegt");
        } else {
            tracing::info!(student = %ergebnis.eintrag().student_id, lab = %ergebnis.eintrag().lab_name, "Anwesenheit protokolliert");
        }
        Ok(ergebnis)
    }

    pub async fn anwesenheit_auflisten(
        &self,
        lab_name: Option<&str>,
        limit: Option<i64>,
    ) -> ApiResult<Vec<AnwesenheitRecord>> {
        let limit = match limit {
            None => STANDARD_LIMIT,
            Some(n) if (1..=MAX_LIMIT).contains(&n) => n,
            Some(n) => {
                return Err(ApiError::validierung(format!(
                    "limit muss zwischen 1 und {MAX_LIMIT} liegen, war {n}"
                )))
            }
        };
        let lab = lab_name.map(str::trim).filter(|s| !s.is_empty());
        Ok(AttendanceRepository::list(&self.db, lab, limit).await?)
    }

    // -- Fingerabdruecke ------------------------------------------------------

    pub async fn fingerabdruecke_auflisten(&self) -> ApiResult<Vec<FingerabdruckRecord>> {
        Ok(FingerprintRepository::list(&self.db).await?)
    }

    pub async fn fingerabdruck_anlegen(
        &self,
        eingabe: &FingerabdruckEingabe,
    ) -> ApiResult<FingerabdruckRecord> {
        let employee_no = pflichtfeld(&eingabe.employee_no, "employeeNo")?;
        let fingerprint_template = pflichtfeld(&eingabe.fingerprint_template, "fingerprintTemplate")?;
        base64_pruefen(fingerprint_template, "fingerprintTemplate")?;

        Ok(FingerprintRepository::create(
            &self.db,
            NeuerFingerabdruck {
                employee_no,
                fingerprint_template,
            },
        )
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pflichtfeld_fehlt_oder_leer() {
        assert!(pflichtfeld(&None, "name").unwrap_err().ist_validierung());
        assert!(pflichtfeld(&Some("   ".into()), "name").is_err());
        assert_eq!(pflichtfeld(&Some(" CL1 ".into()), "name").unwrap(), "CL1");
    }

    #[test]
    fn ids_muessen_positiv_sein() {
        assert!(positive_id(None, "deviceID").is_err());
        assert!(positive_id(Some(0), "deviceID").is_err());
        assert!(positive_id(Some(-3), "deviceID").is_err());
        assert_eq!(positive_id(Some(7), "deviceID").unwrap(), 7);
    }

    #[test]
    fn base64_validierung() {
        assert!(base64_pruefen("aGVsbG8=", "x").is_ok());
        assert!(base64_pruefen("kein base64!", "x").is_err());
    }

    #[test]
    fn anwesenheit_eingabe_feldnamen() {
        let e: AnwesenheitEingabe = serde_json::from_str(
            r#"{"studentID":"2021-0001","fullName":"Ana Cruz","instructor":"Reyes","section":"BSCS 3A","labName":"CL1"}"#,
        )
        .unwrap();
        assert_eq!(e.student_id.as_deref(), Some("2021-0001"));
        assert_eq!(e.lab_name.as_deref(), Some("CL1"));
    }
}
