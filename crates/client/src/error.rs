//! Fehlertypen fuer den Abonnenten-Client

use thiserror::Error;

/// Fehlertyp des Clients
#[derive(Debug, Error)]
pub enum ClientError {
    /// Ungueltige Konfiguration (vor dem Start geprueft)
    #[error("Ungueltige Client-Konfiguration: {0}")]
    Konfiguration(String),

    /// Senden ohne bestehende Verbindung
    #[error("Nicht verbunden")]
    NichtVerbunden,

    /// IO-Fehler (TCP, Runtime, Thread)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket-Protokollfehler
    #[error("WebSocket-Fehler: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// TLS-Konfiguration oder -Handshake
    #[error("TLS-Fehler: {0}")]
    Tls(String),

    /// Verbindungsaufbau dauerte zu lange
    #[error("Zeitlimit beim Verbindungsaufbau")]
    Zeitlimit,
}

impl ClientError {
    pub fn konfiguration(msg: impl Into<String>) -> Self {
        Self::Konfiguration(msg.into())
    }
}

/// Result-Alias fuer den Client
pub type ClientResult<T> = Result<T, ClientError>;
