//! Repository-Trait-Definitionen
//!
//! Das Repository-Pattern entkoppelt die Fassade von der konkreten
//! Datenbank-Implementierung (derzeit SQLite).

use chrono::{DateTime, Utc};
use labcast_core::{DeviceId, VenueId};

use crate::error::DbError;
use crate::models::{
    AnkuendigungRecord, AnwesenheitRecord, FingerabdruckRecord, GeraetRecord,
    NeuerAnwesenheitsEintrag, NeuerFingerabdruck, NeuesGeraet, ProtokollErgebnis, VenueRecord,
    ZuweisungRecord, ZuweisungsErgebnis,
};

/// Result-Typ fuer alle Repository-Operationen
pub type DbResult<T> = Result<T, DbError>;

/// Laenge des gleitenden Duplikat-Fensters fuer Anwesenheitseintraege
pub const DUPLIKAT_FENSTER_SEK: i64 = 60;

/// Konfiguration fuer die Datenbankverbindung
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Verbindungs-URL (z.B. "sqlite://labcast.db")
    pub url: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen im Pool
    pub max_verbindungen: u32,
    /// Ob WAL-Modus aktiviert werden soll
    pub sqlite_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://labcast.db".into(),
            max_verbindungen: 5,
            sqlite_wal: true,
        }
    }
}

/// Geraete-Registry
#[allow(async_fn_in_trait)]
pub trait DeviceRepository: Send + Sync {
    async fn create(&self, data: NeuesGeraet<'_>) -> DbResult<GeraetRecord>;
    async fn get(&self, id: DeviceId) -> DbResult<Option<GeraetRecord>>;
    async fn list(&self) -> DbResult<Vec<GeraetRecord>>;
    /// Entfernt ein Geraet samt Raumzuweisung. `false` wenn unbekannt.
    async fn delete(&self, id: DeviceId) -> DbResult<bool>;
}

/// Raeume / Labore
#[allow(async_fn_in_trait)]
pub trait VenueRepository: Send + Sync {
    async fn create(&self, name: &str) -> DbResult<VenueRecord>;
    async fn get(&self, id: VenueId) -> DbResult<Option<VenueRecord>>;
    async fn list(&self) -> DbResult<Vec<VenueRecord>>;
}

/// Raumzuweisungen (hoechstens eine pro Geraet)
#[allow(async_fn_in_trait)]
pub trait VenueAssignmentRepository: Send + Sync {
    /// Upsert: existiert eine Zuweisung fuer `machine_id`, wird sie
    /// aktualisiert, sonst eingefuegt.
    ///
    /// Nicht atomar: Pruefung und Schreiben sind zwei Anweisungen.
    async fn assign(&self, machine_id: DeviceId, venue_id: VenueId)
        -> DbResult<ZuweisungsErgebnis>;
    async fn get(&self, machine_id: DeviceId) -> DbResult<Option<ZuweisungRecord>>;
    async fn list(&self) -> DbResult<Vec<ZuweisungRecord>>;
}

/// Die einzelne, aktuelle Ankuendigung
///
/// Vorbedingung: die Zeile mit id 1 existiert (Seed der Migration).
#[allow(async_fn_in_trait)]
pub trait AnnouncementRepository: Send + Sync {
    async fn get(&self) -> DbResult<AnkuendigungRecord>;
    /// Ueberschreibt die Ankuendigung bedingungslos
    async fn set(&self, content: &str, is_image: bool) -> DbResult<AnkuendigungRecord>;
}

/// Anwesenheitsprotokoll
#[allow(async_fn_in_trait)]
pub trait AttendanceRepository: Send + Sync {
    /// Duplikat-geschuetztes Einfuegen
    ///
    /// Existiert fuer `student_id` ein Eintrag mit Ankunft >= `jetzt` minus
    /// [`DUPLIKAT_FENSTER_SEK`], wird nichts geschrieben und
    /// `ProtokollErgebnis::Duplikat` zurueckgegeben. Nicht atomar.
    async fn log(
        &self,
        data: NeuerAnwesenheitsEintrag<'_>,
        jetzt: DateTime<Utc>,
    ) -> DbResult<ProtokollErgebnis>;
    /// Neueste Eintraege zuerst, optional gefiltert nach Labor
    async fn list(&self, lab_name: Option<&str>, limit: i64) -> DbResult<Vec<AnwesenheitRecord>>;
    async fn count_for_student(&self, student_id: &str) -> DbResult<i64>;
}

/// Fingerabdruck-Vorlagen fuer die externe Verifikations-App
#[allow(async_fn_in_trait)]
pub trait FingerprintRepository: Send + Sync {
    async fn create(&self, data: NeuerFingerabdruck<'_>) -> DbResult<FingerabdruckRecord>;
    async fn list(&self) -> DbResult<Vec<FingerabdruckRecord>>;
}
