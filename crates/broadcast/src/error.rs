//! Fehlertypen fuer den Broadcast-Endpunkt

use thiserror::Error;

/// Fehlertyp fuer den Broadcast-Endpunkt
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket-Protokollfehler (Handshake, Frame)
    #[error("WebSocket-Fehler: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// TLS-Konfiguration oder -Handshake fehlgeschlagen
    #[error("TLS-Fehler: {0}")]
    Tls(String),

    /// Handshake nicht rechtzeitig abgeschlossen
    #[error("Handshake-Timeout")]
    HandshakeTimeout,
}

impl BroadcastError {
    pub fn tls(msg: impl Into<String>) -> Self {
        Self::Tls(msg.into())
    }
}

/// Result-Alias fuer den Broadcast-Endpunkt
pub type BroadcastResult<T> = Result<T, BroadcastError>;
