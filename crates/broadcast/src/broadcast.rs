//! Event-Broadcaster – Sendet Nachrichten an alle verbundenen Abonnenten
//!
//! Der EventBroadcaster verwaltet die Send-Queues aller verbundenen
//! Abonnenten. Jede `AbonnentVerbindung` liest aus ihrer eigenen Queue und
//! schreibt auf ihren WebSocket, so blockiert kein Abonnent einen anderen.
//!
//! ## Fehlerisolation
//! Ist die Queue eines Abonnenten voll oder geschlossen, wird nur dieser
//! Abonnent entfernt. Entfernt wird erst nach der Iteration, damit die
//! DashMap waehrend des Fan-outs nicht veraendert wird.

use dashmap::DashMap;
use labcast_core::SubscriberId;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Abonnent
pub const SEND_QUEUE_GROESSE: usize = 256;

// ---------------------------------------------------------------------------
// AbonnentSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines verbundenen Abonnenten
#[derive(Clone, Debug)]
pub struct AbonnentSender {
    pub id: SubscriberId,
    pub peer: SocketAddr,
    pub tx: mpsc::Sender<Arc<str>>,
}

impl AbonnentSender {
    /// Reiht eine Nachricht nicht-blockierend ein
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: Arc<str>) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(abonnent = %self.id, peer = %self.peer, "Send-Queue voll – Abonnent wird entfernt");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(abonnent = %self.id, peer = %self.peer, "Send-Queue geschlossen (Abonnent getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentraler Broadcaster fuer alle Abonnenten eines Endpunkts
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

struct EventBroadcasterInner {
    abonnenten: DashMap<SubscriberId, AbonnentSender>,
    queue_groesse: usize,
}

impl EventBroadcaster {
    /// Erstellt einen neuen EventBroadcaster
    pub fn neu() -> Self {
        Self::mit_queue_groesse(SEND_QUEUE_GROESSE)
    }

    /// Erstellt einen Broadcaster mit eigener Queue-Groesse pro Abonnent
    pub fn mit_queue_groesse(queue_groesse: usize) -> Self {
        Self {
            inner: Arc::new(EventBroadcasterInner {
                abonnenten: DashMap::new(),
                queue_groesse: queue_groesse.max(1),
            }),
        }
    }

    /// Registriert einen neuen Abonnenten und gibt seine Empfangs-Queue zurueck
    ///
    /// Nur Nachrichten, die nach diesem Aufruf veroeffentlicht werden,
    /// landen in der Queue.
    pub fn abonnent_registrieren(
        &self,
        id: SubscriberId,
        peer: SocketAddr,
    ) -> mpsc::Receiver<Arc<str>> {
        let (tx, rx) = mpsc::channel(self.inner.queue_groesse);
        self.inner
            .abonnenten
            .insert(id, AbonnentSender { id, peer, tx });
        tracing::debug!(abonnent = %id, peer = %peer, "Abonnent registriert");
        rx
    }

    /// Entfernt einen Abonnenten. Gibt `true` zurueck wenn er registriert war.
    pub fn abonnent_entfernen(&self, id: &SubscriberId) -> bool {
        let entfernt = self.inner.abonnenten.remove(id).is_some();
        if entfernt {
            tracing::debug!(abonnent = %id, "Abonnent entfernt");
        }
        entfernt
    }

    /// Sendet eine Nachricht an alle registrierten Abonnenten
    ///
    /// Ohne Abonnenten passiert nichts. Gibt die Anzahl der erfolgreichen
    /// Zustellungen zurueck.
    pub fn an_alle_senden(&self, nachricht: &str) -> usize {
        let nachricht: Arc<str> = Arc::from(nachricht);
        let mut gesendet = 0;
        let mut fehlgeschlagen = Vec::new();

        self.inner.abonnenten.iter().for_each(|entry| {
            if entry.value().senden(Arc::clone(&nachricht)) {
                gesendet += 1;
            } else {
                fehlgeschlagen.push(*entry.key());
            }
        });

        for id in &fehlgeschlagen {
            self.abonnent_entfernen(id);
        }

        gesendet
    }

    /// Gibt die Anzahl der registrierten Abonnenten zurueck
    pub fn abonnent_anzahl(&self) -> usize {
        self.inner.abonnenten.len()
    }

    /// Prueft ob ein Abonnent registriert ist
    pub fn ist_registriert(&self, id: &SubscriberId) -> bool {
        self.inner.abonnenten.contains_key(id)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    #[tokio::test]
    async fn abonnent_registrieren_und_senden() {
        let broadcaster = EventBroadcaster::neu();
        let id = SubscriberId::new();

        let mut rx = broadcaster.abonnent_registrieren(id, peer());
        assert!(broadcaster.ist_registriert(&id));

        assert_eq!(broadcaster.an_alle_senden("04a10fff"), 1);
        let empfangen = rx.try_recv().expect("Nachricht muss vorhanden sein");
        assert_eq!(&*empfangen, "04a10fff");
    }

    #[test]
    fn ohne_abonnenten_kein_effekt() {
        let broadcaster = EventBroadcaster::neu();
        assert_eq!(broadcaster.an_alle_senden("x"), 0);
        assert_eq!(broadcaster.abonnent_anzahl(), 0);
    }

    #[tokio::test]
    async fn reihenfolge_pro_abonnent() {
        let broadcaster = EventBroadcaster::neu();
        let mut receivers: Vec<_> = (0..3)
            .map(|_| broadcaster.abonnent_registrieren(SubscriberId::new(), peer()))
            .collect();

        for i in 0..10 {
            assert_eq!(broadcaster.an_alle_senden(&format!("uid-{i}")), 3);
        }

        for rx in &mut receivers {
            for i in 0..10 {
                assert_eq!(&*rx.try_recv().unwrap(), format!("uid-{i}"));
            }
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn spaeter_abonnent_sieht_nichts_frueheres() {
        let broadcaster = EventBroadcaster::neu();
        let mut frueh = broadcaster.abonnent_registrieren(SubscriberId::new(), peer());
        broadcaster.an_alle_senden("eins");

        let mut spaet = broadcaster.abonnent_registrieren(SubscriberId::new(), peer());
        broadcaster.an_alle_senden("zwei");

        assert_eq!(&*frueh.try_recv().unwrap(), "eins");
        assert_eq!(&*frueh.try_recv().unwrap(), "zwei");
        assert_eq!(&*spaet.try_recv().unwrap(), "zwei");
        assert!(spaet.try_recv().is_err());
    }

    #[tokio::test]
    async fn geschlossener_abonnent_wird_entfernt_andere_bleiben() {
        let broadcaster = EventBroadcaster::neu();
        let tot = SubscriberId::new();
        let lebendig = SubscriberId::new();

        drop(broadcaster.abonnent_registrieren(tot, peer()));
        let mut rx = broadcaster.abonnent_registrieren(lebendig, peer());

        assert_eq!(broadcaster.an_alle_senden("a"), 1);
        assert!(!broadcaster.ist_registriert(&tot));
        assert!(broadcaster.ist_registriert(&lebendig));

        assert_eq!(broadcaster.an_alle_senden("b"), 1);
        assert_eq!(&*rx.try_recv().unwrap(), "a");
        assert_eq!(&*rx.try_recv().unwrap(), "b");
    }

    #[tokio::test]
    async fn volle_queue_entfernt_nur_diesen_abonnenten() {
        let broadcaster = EventBroadcaster::mit_queue_groesse(2);
        let langsam = SubscriberId::new();
        let _langsam_rx = broadcaster.abonnent_registrieren(langsam, peer());

        broadcaster.an_alle_senden("1");
        broadcaster.an_alle_senden("2");
        let mut schnell = broadcaster.abonnent_registrieren(SubscriberId::new(), peer());

        // Dritte Nachricht passt nicht mehr in die Queue des langsamen Abonnenten
        assert_eq!(broadcaster.an_alle_senden("3"), 1);
        assert!(!broadcaster.ist_registriert(&langsam));
        assert_eq!(&*schnell.try_recv().unwrap(), "3");
    }
}
