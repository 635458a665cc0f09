//! ReconnectingClient – logische Verbindung ueber wechselnde Transporte
//!
//! Der Client besitzt einen eigenen OS-Thread mit einer current-thread
//! Runtime. Dort laeuft die Schleife aus Verbinden, Empfangen und fester
//! Wartezeit. Der Host sieht nur:
//! - `ereignisse()`: thread-sichere Queue mit Nachrichten und Zustandswechseln
//! - `senden()`: reiht Text ein, schlaegt ohne Verbindung sofort fehl
//! - `stoppen()`: beendet Wartezeit oder Empfang sofort
//!
//! Der Netzwerk-Thread fasst keinen Host-Zustand an.

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_rustls::TlsConnector;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::config::ClientKonfig;
use crate::error::{ClientError, ClientResult};
use crate::tls::tls_connector;
use crate::types::{ClientEreignis, ClientZustand};

// ---------------------------------------------------------------------------
// Geteilter Zustand
// ---------------------------------------------------------------------------

/// Zustand den Host und Netzwerk-Thread gemeinsam sehen
struct Geteilt {
    laeuft: AtomicBool,
    zustand: Mutex<ClientZustand>,
    verbindungsversuche: AtomicU64,
    verbindungen: AtomicU64,
    ereignis_tx: async_channel::Sender<ClientEreignis>,
}

impl Geteilt {
    fn laeuft(&self) -> bool {
        self.laeuft.load(Ordering::SeqCst)
    }

    fn zustand(&self) -> ClientZustand {
        *self.zustand.lock()
    }

    /// Setzt den Zustand und meldet echte Wechsel an den Host
    fn zustand_setzen(&self, neu: ClientZustand) {
        let geaendert = {
            let mut z = self.zustand.lock();
            let alt = *z;
            *z = neu;
            alt != neu
        };
        if geaendert {
            tracing::debug!(zustand = %neu, "Client-Zustand gewechselt");
            self.melden(ClientEreignis::Zustand(neu));
        }
    }

    fn melden(&self, ereignis: ClientEreignis) {
        // Unbegrenzte Queue: schlaegt nur fehl wenn der Host sie verworfen hat
        let _ = self.ereignis_tx.try_send(ereignis);
    }
}

// ---------------------------------------------------------------------------
// ReconnectingClient
// ---------------------------------------------------------------------------

/// Selbst-wiederverbindender Abonnent eines Broadcast-Endpunkts
pub struct ReconnectingClient {
    konfig: ClientKonfig,
    geteilt: Arc<Geteilt>,
    ereignis_rx: async_channel::Receiver<ClientEreignis>,
    sende_tx: Option<mpsc::UnboundedSender<String>>,
    stopp_tx: Option<watch::Sender<bool>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl ReconnectingClient {
    /// Erstellt einen Client, ohne ihn zu starten
    pub fn neu(konfig: ClientKonfig) -> ClientResult<Self> {
        konfig.validieren()?;
        let (ereignis_tx, ereignis_rx) = async_channel::unbounded();
        Ok(Self {
            konfig,
            geteilt: Arc::new(Geteilt {
                laeuft: AtomicBool::new(false),
                zustand: Mutex::new(ClientZustand::Getrennt),
                verbindungsversuche: AtomicU64::new(0),
                verbindungen: AtomicU64::new(0),
                ereignis_tx,
            }),
            ereignis_rx,
            sende_tx: None,
            stopp_tx: None,
            thread: None,
        })
    }

    /// Startet den Netzwerk-Thread
    ///
    /// Ein bereits laufender Client bleibt unveraendert.
    pub fn starten(&mut self) -> ClientResult<()> {
        if self.thread.is_some() {
            return Ok(());
        }

        let connector = if self.konfig.tls {
            Some(tls_connector(self.konfig.unsichere_zertifikate)?)
        } else {
            None
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let (sende_tx, sende_rx) = mpsc::unbounded_channel();
        let (stopp_tx, stopp_rx) = watch::channel(false);

        self.geteilt.laeuft.store(true, Ordering::SeqCst);
        self.geteilt.zustand_setzen(ClientZustand::Verbindend);

        let schleife = Schleife {
            konfig: self.konfig.clone(),
            geteilt: Arc::clone(&self.geteilt),
            sende_rx,
            stopp_rx,
            connector,
        };

        let thread = std::thread::Builder::new()
            .name("labcast-client".into())
            .spawn(move || runtime.block_on(schleife.ausfuehren()))
            .map_err(|e| {
                self.geteilt.laeuft.store(false, Ordering::SeqCst);
                self.geteilt.zustand_setzen(ClientZustand::Getrennt);
                ClientError::Io(e)
            })?;

        tracing::info!(url = %self.konfig.url(), "Client gestartet");

        self.sende_tx = Some(sende_tx);
        self.stopp_tx = Some(stopp_tx);
        self.thread = Some(thread);
        Ok(())
    }

    /// Stoppt den Client
    ///
    /// Unterbricht Wartezeit, Verbindungsaufbau und Empfang. Danach gibt es
    /// keine weiteren Verbindungsversuche.
    pub fn stoppen(&mut self) {
        self.geteilt.laeuft.store(false, Ordering::SeqCst);
        if let Some(stopp_tx) = self.stopp_tx.take() {
            let _ = stopp_tx.send(true);
        }
        self.sende_tx = None;

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Client-Thread ist abgestuerzt");
            }
            tracing::info!(url = %self.konfig.url(), "Client gestoppt");
        }
        self.geteilt.zustand_setzen(ClientZustand::Getrennt);
    }

    /// Reiht eine Textnachricht zum Senden ein
    ///
    /// Blockiert nie. Ohne bestehende Verbindung gibt es sofort
    /// `ClientError::NichtVerbunden`. Schreibfehler nach dem Einreihen
    /// kommen als `ClientEreignis::SendenFehlgeschlagen`.
    pub fn senden(&self, text: impl Into<String>) -> ClientResult<()> {
        if self.geteilt.zustand() != ClientZustand::Verbunden {
            return Err(ClientError::NichtVerbunden);
        }
        let tx = self.sende_tx.as_ref().ok_or(ClientError::NichtVerbunden)?;
        tx.send(text.into()).map_err(|_| ClientError::NichtVerbunden)
    }

    /// Aktueller Verbindungszustand
    pub fn zustand(&self) -> ClientZustand {
        self.geteilt.zustand()
    }

    /// Ob der Client gestartet und nicht gestoppt ist
    pub fn ist_aktiv(&self) -> bool {
        self.geteilt.laeuft()
    }

    /// Queue mit Ereignissen fuer den Host
    ///
    /// Synchrone Hosts lesen mit `try_recv` oder `recv_blocking`, async
    /// Hosts mit `recv().await`. Der Receiver ist klonbar.
    pub fn ereignisse(&self) -> &async_channel::Receiver<ClientEreignis> {
        &self.ereignis_rx
    }

    /// Anzahl begonnener Verbindungsversuche
    pub fn verbindungsversuche(&self) -> u64 {
        self.geteilt.verbindungsversuche.load(Ordering::SeqCst)
    }

    /// Anzahl erfolgreicher Handshakes
    pub fn verbindungen(&self) -> u64 {
        self.geteilt.verbindungen.load(Ordering::SeqCst)
    }

    pub fn konfig(&self) -> &ClientKonfig {
        &self.konfig
    }
}

impl Drop for ReconnectingClient {
    fn drop(&mut self) {
        self.stoppen();
    }
}

// ---------------------------------------------------------------------------
// Netzwerk-Schleife (laeuft auf dem Client-Thread)
// ---------------------------------------------------------------------------

/// Wie eine Sitzung endete
enum SitzungsEnde {
    /// Stopp angefordert
    Gestoppt,
    /// Transport verloren, neuer Versuch nach der Wartezeit
    Getrennt(String),
}

/// Maximale Wartezeit auf das Absenden des Close-Frames beim Stopp
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

struct Schleife {
    konfig: ClientKonfig,
    geteilt: Arc<Geteilt>,
    sende_rx: mpsc::UnboundedReceiver<String>,
    stopp_rx: watch::Receiver<bool>,
    connector: Option<TlsConnector>,
}

/// Wartet bis Stopp angefordert oder der Client verworfen wurde
async fn stopp_abwarten(stopp_rx: &mut watch::Receiver<bool>) {
    loop {
        if *stopp_rx.borrow_and_update() {
            return;
        }
        if stopp_rx.changed().await.is_err() {
            return;
        }
    }
}

impl Schleife {
    async fn ausfuehren(mut self) {
        let url = self.konfig.url();

        while self.geteilt.laeuft() {
            self.geteilt.zustand_setzen(ClientZustand::Verbindend);
            let versuch = self.geteilt.verbindungsversuche.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::debug!(url = %url, versuch, "Verbindungsversuch");

            match self.sitzung().await {
                Ok(SitzungsEnde::Gestoppt) => break,
                Ok(SitzungsEnde::Getrennt(grund)) => {
                    tracing::warn!(url = %url, grund = %grund, "Verbindung verloren");
                }
                Err(e) => {
                    tracing::warn!(url = %url, fehler = %e, "Verbindungsaufbau fehlgeschlagen");
                }
            }

            self.geteilt.zustand_setzen(ClientZustand::Getrennt);
            self.veraltete_sendungen_verwerfen("Verbindung verloren");

            if !self.geteilt.laeuft() {
                break;
            }

            let wartezeit = self.konfig.wiederverbinden_nach();
            tracing::info!(
                url = %url,
                wartezeit_ms = wartezeit.as_millis() as u64,
                "Neuer Verbindungsversuch nach Wartezeit"
            );
            tokio::select! {
                _ = tokio::time::sleep(wartezeit) => {}
                _ = stopp_abwarten(&mut self.stopp_rx) => break,
            }
        }

        self.geteilt.zustand_setzen(ClientZustand::Getrennt);
        self.veraltete_sendungen_verwerfen("Client gestoppt");
        tracing::debug!(url = %url, "Client-Schleife beendet");
    }

    /// Baut eine Verbindung auf und empfaengt bis sie endet
    async fn sitzung(&mut self) -> ClientResult<SitzungsEnde> {
        let timeout = self.konfig.verbindungs_timeout();

        let tcp = tokio::select! {
            r = tokio::time::timeout(timeout, TcpStream::connect(self.konfig.adresse())) => {
                r.map_err(|_| ClientError::Zeitlimit)??
            }
            _ = stopp_abwarten(&mut self.stopp_rx) => return Ok(SitzungsEnde::Gestoppt),
        };
        let _ = tcp.set_nodelay(true);

        match self.connector.clone() {
            Some(connector) => {
                let server_name = rustls::pki_types::ServerName::try_from(self.konfig.host.clone())
                    .map_err(|e| ClientError::Tls(format!("Ungueltiger Hostname: {e}")))?;
                let tls = tokio::select! {
                    r = tokio::time::timeout(timeout, connector.connect(server_name, tcp)) => {
                        r.map_err(|_| ClientError::Zeitlimit)?
                            .map_err(|e| ClientError::Tls(e.to_string()))?
                    }
                    _ = stopp_abwarten(&mut self.stopp_rx) => return Ok(SitzungsEnde::Gestoppt),
                };
                self.websocket_sitzung(tls).await
            }
            None => self.websocket_sitzung(tcp).await,
        }
    }

    async fn websocket_sitzung<S>(&mut self, stream: S) -> ClientResult<SitzungsEnde>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let timeout = self.konfig.verbindungs_timeout();
        let ws = tokio::select! {
            r = tokio::time::timeout(timeout, tokio_tungstenite::client_async(self.konfig.url(), stream)) => {
                r.map_err(|_| ClientError::Zeitlimit)??.0
            }
            _ = stopp_abwarten(&mut self.stopp_rx) => return Ok(SitzungsEnde::Gestoppt),
        };

        self.geteilt.verbindungen.fetch_add(1, Ordering::SeqCst);
        self.geteilt.zustand_setzen(ClientZustand::Verbunden);
        tracing::info!(url = %self.konfig.url(), "Verbunden");

        Ok(self.empfangen(ws).await)
    }

    /// Liest, schreibt und wartet auf Stopp nebenlaeufig
    ///
    /// Ein haengender Schreibvorgang blockiert weder Empfang noch Stopp.
    async fn empfangen<S>(&mut self, ws: WebSocketStream<S>) -> SitzungsEnde
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut sink, mut eingang) = ws.split();
        let geteilt = &self.geteilt;
        let sende_rx = &mut self.sende_rx;
        let stopp_rx = &mut self.stopp_rx;

        let leser = async {
            loop {
                match eingang.next().await {
                    Some(Ok(Message::Text(text))) => {
                        geteilt.melden(ClientEreignis::Nachricht(text.to_string()));
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return SitzungsEnde::Getrennt("vom Server geschlossen".into());
                    }
                    Some(Ok(_)) => {
                        // Binary/Ping/Pong
                    }
                    Some(Err(e)) => return SitzungsEnde::Getrennt(e.to_string()),
                }
            }
        };

        let schreiber = async {
            // None: Client verworfen
            while let Some(text) = sende_rx.recv().await {
                if let Err(e) = sink.send(Message::text(text.clone())).await {
                    let grund = e.to_string();
                    geteilt.melden(ClientEreignis::SendenFehlgeschlagen {
                        nachricht: text,
                        grund: grund.clone(),
                    });
                    return SitzungsEnde::Getrennt(grund);
                }
            }
            SitzungsEnde::Gestoppt
        };

        let ende = tokio::select! {
            ende = leser => ende,
            ende = schreiber => ende,
            _ = stopp_abwarten(stopp_rx) => SitzungsEnde::Gestoppt,
        };

        if matches!(ende, SitzungsEnde::Gestoppt) {
            let close = sink.send(Message::Close(None));
            if tokio::time::timeout(CLOSE_TIMEOUT, close).await.is_err() {
                tracing::debug!("Close-Frame nicht rechtzeitig gesendet");
            }
        }
        ende
    }

    /// Meldet eingereihte, aber nicht mehr schreibbare Nachrichten
    fn veraltete_sendungen_verwerfen(&mut self, grund: &str) {
        while let Ok(nachricht) = self.sende_rx.try_recv() {
            self.geteilt.melden(ClientEreignis::SendenFehlgeschlagen {
                nachricht,
                grund: grund.to_string(),
            });
        }
    }
}
