//! Tap-Events und Broadcast-Nutzlast
//!
//! Ein `TapEvent` ist ein vom Kartenleser erfasster UID-Token. Er wird nie
//! persistiert, sondern nur an die verbundenen Abonnenten verteilt.
//!
//! ## Nutzlast-Formate
//! ```text
//! Roh:  3a9f01c2
//! JSON: {"message":"3a9f01c2"}
//! ```
//! Aeltere Produzenten senden nur das rohe Format. Decoder akzeptieren
//! deshalb immer beide Formate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ein erfasster Identifikations-Token mit Erfassungszeitpunkt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapEvent {
    /// Opaker UID-String (bei NFC: Hex-Darstellung der Karten-UID)
    pub uid: String,
    /// Zeitpunkt der Erfassung
    pub erfasst_am: DateTime<Utc>,
}

impl TapEvent {
    /// Erstellt ein neues Event mit dem aktuellen Zeitpunkt
    pub fn neu(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            erfasst_am: Utc::now(),
        }
    }

    /// Kodiert das Event als Broadcast-Nachricht im gewuenschten Format
    ///
    /// Der Zeitstempel bleibt lokal und wird nicht uebertragen.
    pub fn als_nachricht(&self, format: NutzlastFormat) -> String {
        Nutzlast::neu(self.uid.clone()).kodieren(format)
    }
}

/// Ausgehendes Format der Broadcast-Nachrichten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NutzlastFormat {
    /// Nur der Token-String (Altformat)
    Roh,
    /// JSON-Umschlag `{"message": ...}`
    #[default]
    Json,
}

/// Inhalt einer Broadcast-Nachricht, unabhaengig vom Leitungsformat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nutzlast {
    #[serde(rename = "message")]
    pub nachricht: String,
}

impl Nutzlast {
    pub fn neu(nachricht: impl Into<String>) -> Self {
        Self {
            nachricht: nachricht.into(),
        }
    }

    /// Kodiert die Nutzlast fuer die Leitung
    pub fn kodieren(&self, format: NutzlastFormat) -> String {
        match format {
            NutzlastFormat::Roh => self.nachricht.clone(),
            NutzlastFormat::Json => serde_json::json!({ "message": self.nachricht }).to_string(),
        }
    }

    /// Dekodiert eine eingehende Nachricht
    ///
    /// Ein JSON-Objekt mit String-Feld `message` wird ausgepackt, alles
    /// andere (auch sonstiges JSON) gilt als roher Inhalt.
    pub fn dekodieren(text: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(serde_json::Value::Object(map)) => match map.get("message") {
                Some(serde_json::Value::String(s)) => Self::neu(s.clone()),
                _ => Self::neu(text),
            },
            _ => Self::neu(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_umschlag_kodieren() {
        let text = Nutzlast::neu("04a10fff").kodieren(NutzlastFormat::Json);
        let wert: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(wert["message"], "04a10fff");
    }

    #[test]
    fn roh_kodieren_ist_unveraendert() {
        assert_eq!(Nutzlast::neu("abc").kodieren(NutzlastFormat::Roh), "abc");
    }

    #[test]
    fn dekodieren_akzeptiert_beide_formate() {
        assert_eq!(Nutzlast::dekodieren("04a10fff").nachricht, "04a10fff");
        assert_eq!(
            Nutzlast::dekodieren(r#"{"message":"show_schedule"}"#).nachricht,
            "show_schedule"
        );
    }

    #[test]
    fn fremdes_json_bleibt_roh() {
        let text = r#"["Labor schliesst", 10]"#;
        assert_eq!(Nutzlast::dekodieren(text).nachricht, text);
        let text = r#"{"message": 5}"#;
        assert_eq!(Nutzlast::dekodieren(text).nachricht, text);
    }

    #[test]
    fn event_als_nachricht() {
        let event = TapEvent::neu("deadbeef");
        assert_eq!(event.als_nachricht(NutzlastFormat::Roh), "deadbeef");
        assert_eq!(
            Nutzlast::dekodieren(&event.als_nachricht(NutzlastFormat::Json)).nachricht,
            "deadbeef"
        );
    }

    #[test]
    fn format_aus_toml_string() {
        #[derive(Deserialize)]
        struct Wrapper {
            format: NutzlastFormat,
        }
        let w: Wrapper = serde_json::from_str(r#"{"format":"roh"}"#).unwrap();
        assert_eq!(w.format, NutzlastFormat::Roh);
    }
}
