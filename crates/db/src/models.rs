//! Datenbankmodelle fuer Labcast
//!
//! Diese Typen repraesentieren Datensaetze aus der Datenbank. Die
//! Feldnamen im JSON folgen den Namen, die die Anzeige-Clients erwarten.

use chrono::{DateTime, Utc};
use labcast_core::{DeviceId, VenueId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Geraete
// ---------------------------------------------------------------------------

/// Registriertes Anzeige-Geraet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeraetRecord {
    pub id: DeviceId,
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Daten zum Registrieren eines Geraets
#[derive(Debug, Clone)]
pub struct NeuesGeraet<'a> {
    pub name: &'a str,
}

// ---------------------------------------------------------------------------
// Raeume
// ---------------------------------------------------------------------------

/// Raum / Labor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueRecord {
    pub id: VenueId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Raumzuweisungen
// ---------------------------------------------------------------------------

/// Zuweisung Geraet -> Raum (hoechstens eine pro Geraet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZuweisungRecord {
    #[serde(rename = "machineID")]
    pub machine_id: DeviceId,
    #[serde(rename = "venueID")]
    pub venue_id: VenueId,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Welchen Zweig die Zuweisung genommen hat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZuweisungsErgebnis {
    Eingefuegt,
    Aktualisiert,
}

// ---------------------------------------------------------------------------
// Ankuendigung
// ---------------------------------------------------------------------------

/// Die aktuelle (einzige) Ankuendigung
///
/// Bei `is_image` ist `content` base64-kodierter Bildinhalt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnkuendigungRecord {
    pub content: String,
    #[serde(rename = "isImage")]
    pub is_image: bool,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Anwesenheit
// ---------------------------------------------------------------------------

/// Anwesenheitseintrag eines Studierenden
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnwesenheitRecord {
    pub id: i64,
    #[serde(rename = "studentID")]
    pub student_id: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub instructor: String,
    pub section: String,
    #[serde(rename = "labName")]
    pub lab_name: String,
    #[serde(rename = "arrivalTimestamp")]
    pub arrival: DateTime<Utc>,
}

/// Daten fuer einen neuen Anwesenheitseintrag
#[derive(Debug, Clone)]
pub struct NeuerAnwesenheitsEintrag<'a> {
    pub student_id: &'a str,
    pub full_name: &'a str,
    pub instructor: &'a str,
    pub section: &'a str,
    pub lab_name: &'a str,
}

/// Ergebnis eines duplikat-geschuetzten Anwesenheits-Schreibvorgangs
#[derive(Debug, Clone, PartialEq)]
pub enum ProtokollErgebnis {
    /// Neuer Eintrag angelegt
    Eingefuegt(AnwesenheitRecord),
    /// Innerhalb des Fensters existiert bereits ein Eintrag, nichts geschrieben
    Duplikat(AnwesenheitRecord),
}

impl ProtokollErgebnis {
    pub fn ist_duplikat(&self) -> bool {
        matches!(self, Self::Duplikat(_))
    }

    pub fn eintrag(&self) -> &AnwesenheitRecord {
        match self {
            Self::Eingefuegt(e) | Self::Duplikat(e) => e,
        }
    }
}

// ---------------------------------------------------------------------------
// Fingerabdruck-Vorlagen
// ---------------------------------------------------------------------------

/// Fingerabdruck-Vorlage eines Mitarbeiters (base64)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerabdruckRecord {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "EmployeeNo")]
    pub employee_no: String,
    #[serde(rename = "fingerprint_template")]
    pub fingerprint_template: String,
}

/// Daten fuer eine neue Fingerabdruck-Vorlage
#[derive(Debug, Clone)]
pub struct NeuerFingerabdruck<'a> {
    pub employee_no: &'a str,
    pub fingerprint_template: &'a str,
}
