//! TCP-Listener – Bindet Socket, akzeptiert Abonnenten
//!
//! Der `BroadcastServer` bindet einen TCP-Socket und startet fuer jede
//! eingehende Verbindung einen eigenen lokalen Task mit einer
//! `AbonnentVerbindung` (optional hinter TLS).
//!
//! ## Concurrency-Modell
//! Alle Verbindungs-Tasks laufen in einer `tokio::task::LocalSet`. Der
//! Broadcaster ist trotzdem `Send + Sync`, damit der Publisher und die
//! REST-API ihn von ausserhalb nutzen koennen.

use std::cell::Cell;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::LocalSet;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;

use crate::broadcast::EventBroadcaster;
use crate::connection::{AbonnentVerbindung, HANDSHAKE_TIMEOUT};
use crate::error::{BroadcastError, BroadcastResult};

/// Standard-Obergrenze gleichzeitiger Abonnenten pro Endpunkt
pub const MAX_ABONNENTEN: usize = 512;

/// Einstellungen eines Broadcast-Endpunkts
#[derive(Clone)]
pub struct EndpunktOptionen {
    /// Name fuer Logs ("leser", "relay", ...)
    pub name: String,
    /// Eingehende Textnachrichten an alle weiterverteilen
    pub relay: bool,
    /// TLS-Acceptor (None = unverschluesseltes ws://)
    pub tls: Option<TlsAcceptor>,
    /// Maximale Anzahl gleichzeitiger Verbindungen (inkl. laufender Handshakes)
    pub max_abonnenten: usize,
    /// Zeitlimit fuer TLS- und WebSocket-Handshake
    pub handshake_timeout: Duration,
}

impl Default for EndpunktOptionen {
    fn default() -> Self {
        Self {
            name: "broadcast".into(),
            relay: false,
            tls: None,
            max_abonnenten: MAX_ABONNENTEN,
            handshake_timeout: HANDSHAKE_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for EndpunktOptionen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpunktOptionen")
            .field("name", &self.name)
            .field("relay", &self.relay)
            .field("tls", &self.tls.is_some())
            .field("max_abonnenten", &self.max_abonnenten)
            .field("handshake_timeout", &self.handshake_timeout)
            .finish()
    }
}

/// Belegter Verbindungsplatz, wird beim Drop freigegeben
struct Platz(Rc<Cell<usize>>);

impl Platz {
    fn belegen(offen: &Rc<Cell<usize>>) -> Self {
        offen.set(offen.get() + 1);
        Self(offen.clone())
    }
}

impl Drop for Platz {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// TLS-Handshake mit Zeitlimit
async fn tls_annehmen(
    acceptor: TlsAcceptor,
    stream: TcpStream,
    zeitlimit: Duration,
) -> BroadcastResult<TlsStream<TcpStream>> {
    match tokio::time::timeout(zeitlimit, acceptor.accept(stream)).await {
        Ok(tls_stream) => Ok(tls_stream?),
        Err(_) => Err(BroadcastError::HandshakeTimeout),
    }
}

/// WebSocket-Broadcast-Server
///
/// Der Socket wird bereits in [`BroadcastServer::binden`] gebunden, damit
/// die tatsaechliche Adresse (z.B. bei Port 0) vor dem Start bekannt ist.
pub struct BroadcastServer {
    broadcaster: EventBroadcaster,
    listener: TcpListener,
    optionen: EndpunktOptionen,
}

impl BroadcastServer {
    /// Bindet den TCP-Socket
    pub async fn binden(
        bind_addr: SocketAddr,
        broadcaster: EventBroadcaster,
        optionen: EndpunktOptionen,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        Ok(Self {
            broadcaster,
            listener,
            optionen,
        })
    }

    /// Gibt die tatsaechlich gebundene Adresse zurueck
    pub fn lokale_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Gibt den Broadcaster dieses Endpunkts zurueck
    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }

    /// Startet die Accept-Loop
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten(
        self,
        shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let local = LocalSet::new();
        local.run_until(self.accept_loop(shutdown_rx)).await
    }

    /// Interne Accept-Loop (laeuft innerhalb der LocalSet)
    async fn accept_loop(
        self,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let lokale_addr = self.listener.local_addr()?;
        let endpunkt = self.optionen.name.clone();
        // Verbindungs-Tasks inkl. laufender Handshakes
        let offen = Rc::new(Cell::new(0usize));

        tracing::info!(
            endpunkt = %endpunkt,
            adresse = %lokale_addr,
            relay = self.optionen.relay,
            tls = self.optionen.tls.is_some(),
            "Broadcast-Endpunkt gestartet"
        );

        loop {
            tokio::select! {
                // Neue eingehende Verbindung
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let anzahl = offen.get().max(self.broadcaster.abonnent_anzahl());
                            if anzahl >= self.optionen.max_abonnenten {
                                tracing::warn!(
                                    endpunkt = %endpunkt,
                                    peer = %peer_addr,
                                    max = self.optionen.max_abonnenten,
                                    "Endpunkt voll – Verbindung abgelehnt"
                                );
                                drop(stream);
                                continue;
                            }

                            if let Err(e) = stream.set_nodelay(true) {
                                tracing::debug!(peer = %peer_addr, fehler = %e, "TCP_NODELAY nicht gesetzt");
                            }
                            tracing::debug!(endpunkt = %endpunkt, peer = %peer_addr, "Verbindung akzeptiert");

                            let verbindung = AbonnentVerbindung::neu(
                                self.broadcaster.clone(),
                                peer_addr,
                                self.optionen.relay,
                            )
                            .mit_handshake_timeout(self.optionen.handshake_timeout);
                            let zeitlimit = self.optionen.handshake_timeout;
                            let shutdown_rx_clone = shutdown_rx.clone();
                            let tls = self.optionen.tls.clone();
                            let platz = Platz::belegen(&offen);

                            // Lokaler Task – kein Send erforderlich
                            tokio::task::spawn_local(async move {
                                let _platz = platz;
                                match tls {
                                    Some(acceptor) => match tls_annehmen(acceptor, stream, zeitlimit).await {
                                        Ok(tls_stream) => {
                                            verbindung.verarbeiten(tls_stream, shutdown_rx_clone).await;
                                        }
                                        Err(e) => {
                                            tracing::warn!(
                                                peer = %peer_addr,
                                                fehler = %e,
                                                "TLS-Handshake fehlgeschlagen"
                                            );
                                        }
                                    },
                                    None => verbindung.verarbeiten(stream, shutdown_rx_clone).await,
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(endpunkt = %endpunkt, "Broadcast-Endpunkt: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!(endpunkt = %endpunkt, "Broadcast-Endpunkt gestoppt");
        Ok(())
    }
}
