//! Steuerbefehle der Bedienkonsolen
//!
//! Fuer den Transport sind Steuerbefehle opake Nachrichten. Die Anzeige-Hosts
//! interpretieren sie mit [`Steuerbefehl::interpretieren`].
//!
//! ```text
//! show_schedule            -> Stundenplan anzeigen
//! show_image               -> Bild-Ankuendigung anzeigen
//! show_announcement        -> Text-Ankuendigung anzeigen
//! ["Raum schliesst", 15]   -> zeitlich begrenzte Ankuendigung (Minuten)
//! ```

use serde::{Deserialize, Serialize};

const ZEIGE_STUNDENPLAN: &str = "show_schedule";
const ZEIGE_BILD: &str = "show_image";
const ZEIGE_ANKUENDIGUNG: &str = "show_announcement";

/// Interpretierter Inhalt einer Broadcast-Nachricht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Steuerbefehl {
    ZeigeStundenplan,
    ZeigeBild,
    ZeigeAnkuendigung,
    /// Ankuendigung die nach `dauer_minuten` wieder verschwindet
    ZeitAnkuendigung { nachricht: String, dauer_minuten: u32 },
    /// Alles andere (z.B. eine UID)
    Text(String),
}

impl Steuerbefehl {
    /// Interpretiert den (bereits dekodierten) Nachrichtentext
    pub fn interpretieren(text: &str) -> Self {
        match text.trim() {
            ZEIGE_STUNDENPLAN => return Self::ZeigeStundenplan,
            ZEIGE_BILD => return Self::ZeigeBild,
            ZEIGE_ANKUENDIGUNG => return Self::ZeigeAnkuendigung,
            _ => {}
        }

        if let Ok(serde_json::Value::Array(teile)) = serde_json::from_str(text) {
            if let [serde_json::Value::String(nachricht), dauer] = teile.as_slice() {
                let dauer_minuten = match dauer {
                    serde_json::Value::Number(n) => n.as_u64(),
                    serde_json::Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                };
                if let Some(d) = dauer_minuten.and_then(|d| u32::try_from(d).ok()) {
                    return Self::ZeitAnkuendigung {
                        nachricht: nachricht.clone(),
                        dauer_minuten: d,
                    };
                }
            }
        }

        Self::Text(text.to_string())
    }

    /// Kodiert den Befehl so wie Bedienkonsolen ihn senden
    pub fn als_nachricht(&self) -> String {
        match self {
            Self::ZeigeStundenplan => ZEIGE_STUNDENPLAN.into(),
            Self::ZeigeBild => ZEIGE_BILD.into(),
            Self::ZeigeAnkuendigung => ZEIGE_ANKUENDIGUNG.into(),
            Self::ZeitAnkuendigung {
                nachricht,
                dauer_minuten,
            } => serde_json::json!([nachricht, dauer_minuten]).to_string(),
            Self::Text(t) => t.clone(),
        }
    }
}
