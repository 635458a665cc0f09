//! Abonnenten-Verbindung – Verwaltet einen einzelnen WebSocket
//!
//! Jede angenommene Verbindung bekommt eine `AbonnentVerbindung` in einem
//! eigenen lokalen Task. Nach dem Handshake wird der Abonnent im
//! Broadcaster registriert und bekommt ab dann jedes veroeffentlichte Event.
//!
//! ## Ablauf
//! ```text
//! Handshake -> registriert -> (Queue -> WebSocket | WebSocket -> Relay)
//!                                 |
//!                                 v
//!                 Schreibfehler / Close / Shutdown -> entfernt
//! ```

use futures_util::{SinkExt, StreamExt};
use labcast_core::SubscriberId;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::broadcast::EventBroadcaster;
use crate::error::{BroadcastError, BroadcastResult};

/// Standard-Zeitlimit eines Handshakes (TLS und WebSocket je einzeln)
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximale Wartezeit auf das Absenden des Close-Frames
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket-Upgrade mit Zeitlimit
async fn handshake<S>(stream: S, zeitlimit: Duration) -> BroadcastResult<WebSocketStream<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match tokio::time::timeout(zeitlimit, tokio_tungstenite::accept_async(stream)).await {
        Ok(ws) => Ok(ws?),
        Err(_) => Err(BroadcastError::HandshakeTimeout),
    }
}

/// Verarbeitet eine einzelne Abonnenten-Verbindung
pub struct AbonnentVerbindung {
    broadcaster: EventBroadcaster,
    peer_addr: SocketAddr,
    relay: bool,
    handshake_timeout: Duration,
}

impl AbonnentVerbindung {
    /// Erstellt eine neue Verbindung
    ///
    /// Bei `relay` wird jede eingehende Textnachricht an alle Abonnenten
    /// (einschliesslich des Absenders) weiterverteilt. Binaerframes mit
    /// gueltigem UTF-8 werden als Text weitergegeben.
    pub fn neu(broadcaster: EventBroadcaster, peer_addr: SocketAddr, relay: bool) -> Self {
        Self {
            broadcaster,
            peer_addr,
            relay,
            handshake_timeout: HANDSHAKE_TIMEOUT,
        }
    }

    pub fn mit_handshake_timeout(mut self, zeitlimit: Duration) -> Self {
        self.handshake_timeout = zeitlimit;
        self
    }

    /// Verteilt eine eingehende Nachricht im Relay-Modus an alle Abonnenten
    fn weiterleiten(&self, text: &str) {
        if self.relay {
            let zugestellt = self.broadcaster.an_alle_senden(text);
            tracing::info!(
                peer = %self.peer_addr,
                nachricht = %text,
                zugestellt,
                "Nachricht weitergeleitet"
            );
        } else {
            tracing::trace!(peer = %self.peer_addr, "Eingehende Nachricht ignoriert");
        }
    }

    /// Fuehrt Handshake und Verbindungsschleife aus
    ///
    /// Laeuft bis der Abonnent trennt, ein Schreibfehler auftritt, der
    /// Broadcaster ihn entfernt oder ein Shutdown-Signal eingeht.
    pub async fn verarbeiten<S>(self, stream: S, mut shutdown_rx: tokio::sync::watch::Receiver<bool>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let peer_addr = self.peer_addr;

        let ws = match handshake(stream, self.handshake_timeout).await {
            Ok(ws) => ws,
            Err(e) => {
                tracing::warn!(peer = %peer_addr, fehler = %e, "WebSocket-Handshake fehlgeschlagen");
                return;
            }
        };

        let id = SubscriberId::new();
        let mut queue = self.broadcaster.abonnent_registrieren(id, peer_addr);
        tracing::info!(
            peer = %peer_addr,
            abonnent = %id,
            anzahl = self.broadcaster.abonnent_anzahl(),
            "Abonnent verbunden"
        );

        let (mut sink, mut eingang) = ws.split();

        loop {
            tokio::select! {
                // Broadcaster -> WebSocket
                ausgehend = queue.recv() => {
                    match ausgehend {
                        Some(nachricht) => {
                            if let Err(e) = sink.send(Message::text(&*nachricht)).await {
                                tracing::warn!(
                                    peer = %peer_addr,
                                    fehler = %e,
                                    "Senden fehlgeschlagen"
                                );
                                break;
                            }
                        }
                        None => {
                            // Vom Broadcaster entfernt (Queue voll)
                            tracing::debug!(peer = %peer_addr, "Send-Queue geschlossen");
                            let _ = tokio::time::timeout(CLOSE_TIMEOUT, sink.send(Message::Close(None))).await;
                            break;
                        }
                    }
                }

                // WebSocket -> (Relay)
                eingehend = eingang.next() => {
                    match eingehend {
                        Some(Ok(Message::Text(text))) => self.weiterleiten(&text),
                        Some(Ok(Message::Binary(daten))) => match std::str::from_utf8(&daten) {
                            Ok(text) => self.weiterleiten(text),
                            Err(_) => {
                                tracing::debug!(
                                    peer = %peer_addr,
                                    bytes = daten.len(),
                                    "Binaernachricht ohne UTF-8 verworfen"
                                );
                            }
                        },
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!(peer = %peer_addr, "Abonnent hat getrennt");
                            break;
                        }
                        Some(Ok(_)) => {
                            // Ping/Pong: Pong beantwortet tungstenite selbst
                        }
                        Some(Err(e)) => {
                            tracing::warn!(
                                peer = %peer_addr,
                                fehler = %e,
                                "WebSocket-Lesefehler"
                            );
                            break;
                        }
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::debug!(peer = %peer_addr, "Shutdown – Verbindung wird geschlossen");
                        let _ = tokio::time::timeout(CLOSE_TIMEOUT, sink.send(Message::Close(None))).await;
                        break;
                    }
                }
            }
        }

        self.broadcaster.abonnent_entfernen(&id);
        tracing::info!(
            peer = %peer_addr,
            abonnent = %id,
            anzahl = self.broadcaster.abonnent_anzahl(),
            "Abonnent entfernt"
        );
    }
}
