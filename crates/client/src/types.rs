//! Zustaende und Ereignisse des Clients

use labcast_core::{Nutzlast, Steuerbefehl};

/// Logischer Verbindungszustand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientZustand {
    /// Keine Verbindung (vor dem Start, nach dem Stopp, waehrend der Wartezeit)
    #[default]
    Getrennt,
    /// Verbindungsaufbau laeuft
    Verbindend,
    /// Handshake abgeschlossen
    Verbunden,
}

impl std::fmt::Display for ClientZustand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Getrennt => "getrennt",
            Self::Verbindend => "verbindend",
            Self::Verbunden => "verbunden",
        };
        f.write_str(s)
    }
}

/// Ereignis vom Netzwerk-Thread an den Host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEreignis {
    /// Zustandswechsel
    Zustand(ClientZustand),
    /// Eingehende Textnachricht (unveraendert)
    Nachricht(String),
    /// Eine mit `senden` eingereihte Nachricht konnte nicht geschrieben werden
    SendenFehlgeschlagen { nachricht: String, grund: String },
}

impl ClientEreignis {
    /// Dekodierte Nutzlast einer eingehenden Nachricht (Roh oder JSON)
    pub fn nutzlast(&self) -> Option<Nutzlast> {
        match self {
            Self::Nachricht(text) => Some(Nutzlast::dekodieren(text)),
            _ => None,
        }
    }

    /// Interpretiert eine eingehende Nachricht als Steuerbefehl
    pub fn steuerbefehl(&self) -> Option<Steuerbefehl> {
        self.nutzlast()
            .map(|n| Steuerbefehl::interpretieren(&n.nachricht))
    }
}
