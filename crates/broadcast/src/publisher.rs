//! Event-Publisher – Fragt die Identitaetsquelle ab und veroeffentlicht UIDs
//!
//! Die Quelle wird in einem festen Intervall abgefragt. Liefert sie eine
//! UID, geht sie als Broadcast-Nachricht an alle Abonnenten. Fehler der
//! Quelle gelten als "keine Karte" und beenden die Schleife nie.

use async_trait::async_trait;
use labcast_core::{NutzlastFormat, TapEvent};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::broadcast::EventBroadcaster;

/// Standard-Abfrageintervall
pub const STANDARD_INTERVALL: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Identitaetsquellen
// ---------------------------------------------------------------------------

/// Quelle fuer Identifikations-Token (z.B. NFC-Leser)
///
/// `abfragen` darf nicht dauerhaft blockieren: `Ok(None)` heisst "gerade
/// keine Karte".
#[async_trait]
pub trait IdentitySource: Send {
    async fn abfragen(&mut self) -> anyhow::Result<Option<String>>;

    /// Name fuer Logs
    fn name(&self) -> &str;
}

/// Quelle die nie etwas liefert
#[derive(Debug, Default)]
pub struct NullQuelle;

#[async_trait]
impl IdentitySource for NullQuelle {
    async fn abfragen(&mut self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// Quelle die aus einem mpsc-Kanal liest (stdin, Tests)
pub struct KanalQuelle {
    name: String,
    rx: mpsc::Receiver<String>,
}

impl KanalQuelle {
    pub fn neu(name: impl Into<String>, rx: mpsc::Receiver<String>) -> Self {
        Self {
            name: name.into(),
            rx,
        }
    }
}

#[async_trait]
impl IdentitySource for KanalQuelle {
    async fn abfragen(&mut self) -> anyhow::Result<Option<String>> {
        match self.rx.try_recv() {
            Ok(uid) => Ok(Some(uid)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(anyhow::anyhow!("Quelle '{}' geschlossen", self.name))
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// EventPublisher
// ---------------------------------------------------------------------------

/// Einstellungen des Publishers
#[derive(Debug, Clone, Copy)]
pub struct PublisherOptionen {
    /// Pause zwischen zwei Abfragen
    pub intervall: Duration,
    /// Ausgehendes Nutzlast-Format
    pub format: NutzlastFormat,
}

impl Default for PublisherOptionen {
    fn default() -> Self {
        Self {
            intervall: STANDARD_INTERVALL,
            format: NutzlastFormat::default(),
        }
    }
}

/// Polling-Loop ueber einer Identitaetsquelle
pub struct EventPublisher {
    quelle: Box<dyn IdentitySource>,
    broadcaster: EventBroadcaster,
    optionen: PublisherOptionen,
}

impl EventPublisher {
    pub fn neu(
        quelle: Box<dyn IdentitySource>,
        broadcaster: EventBroadcaster,
        optionen: PublisherOptionen,
    ) -> Self {
        Self {
            quelle,
            broadcaster,
            optionen,
        }
    }

    /// Eine Iteration: abfragen und ggf. veroeffentlichen
    ///
    /// Gibt das veroeffentlichte Event zurueck, `None` wenn die Quelle
    /// nichts geliefert hat oder fehlgeschlagen ist.
    pub async fn einmal(&mut self) -> Option<TapEvent> {
        let uid = match self.quelle.abfragen().await {
            Ok(Some(uid)) if !uid.trim().is_empty() => uid.trim().to_string(),
            Ok(_) => return None,
            Err(e) => {
                tracing::trace!(quelle = self.quelle.name(), fehler = %e, "Quelle lieferte keine UID");
                return None;
            }
        };

        let event = TapEvent::neu(uid);
        let zugestellt = self
            .broadcaster
            .an_alle_senden(&event.als_nachricht(self.optionen.format));

        tracing::info!(uid = %event.uid, zugestellt, "Karten-UID veroeffentlicht");
        Some(event)
    }

    /// Startet die Polling-Loop
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten(mut self, mut shutdown_rx: tokio::sync::watch::Receiver<bool>) {
        tracing::info!(
            quelle = self.quelle.name(),
            intervall_ms = self.optionen.intervall.as_millis() as u64,
            format = ?self.optionen.format,
            "Event-Publisher gestartet"
        );

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            self.einmal().await;

            tokio::select! {
                _ = tokio::time::sleep(self.optionen.intervall) => {}
                Ok(()) = shutdown_rx.changed() => {}
            }
        }

        tracing::info!("Event-Publisher gestoppt");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
