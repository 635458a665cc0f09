//! Client-Konfiguration
//!
//! Alle Felder haben Standardwerte (lokaler Leser ueber wss://). Die
//! Konfiguration wird beim Erzeugen des Clients geprueft.

use serde::{Deserialize, Serialize};
use std::net::Ipv6Addr;
use std::time::Duration;

use crate::error::{ClientError, ClientResult};

/// Konfiguration eines Abonnenten-Clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientKonfig {
    /// Hostname oder IP des Broadcast-Endpunkts
    pub host: String,
    /// Port des Broadcast-Endpunkts
    pub port: u16,
    /// HTTP-Pfad fuer den WebSocket-Handshake
    pub pfad: String,
    /// wss:// statt ws://
    pub tls: bool,
    /// Selbstsignierte Zertifikate akzeptieren (nur fuer lokale Leser setzen)
    pub unsichere_zertifikate: bool,
    /// Feste Wartezeit vor einem neuen Verbindungsversuch (ms, > 0)
    pub wiederverbinden_ms: u64,
    /// Zeitlimit fuer TCP-, TLS- und WebSocket-Handshake (ms)
    pub verbindungs_timeout_ms: u64,
}

impl Default for ClientKonfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8765,
            pfad: "/".into(),
            tls: true,
            unsichere_zertifikate: false,
            wiederverbinden_ms: 5000,
            verbindungs_timeout_ms: 10_000,
        }
    }
}

impl ClientKonfig {
    /// Unverschluesselte Verbindung zu `host:port`, sonst Standardwerte
    pub fn ws(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tls: false,
            ..Self::default()
        }
    }

    /// Prueft die Konfiguration
    pub fn validieren(&self) -> ClientResult<()> {
        if self.host.trim().is_empty() {
            return Err(ClientError::konfiguration("host darf nicht leer sein"));
        }
        if self.port == 0 {
            return Err(ClientError::konfiguration("port darf nicht 0 sein"));
        }
        if !self.pfad.starts_with('/') {
            return Err(ClientError::konfiguration("pfad muss mit '/' beginnen"));
        }
        if self.wiederverbinden_ms == 0 {
            return Err(ClientError::konfiguration(
                "wiederverbinden_ms muss groesser als 0 sein",
            ));
        }
        if self.verbindungs_timeout_ms == 0 {
            return Err(ClientError::konfiguration(
                "verbindungs_timeout_ms muss groesser als 0 sein",
            ));
        }
        Ok(())
    }

    /// Host fuer URL und Socket-Adresse, IPv6-Literale in Klammern
    fn host_fuer_adresse(&self) -> String {
        if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }

    /// WebSocket-URL des Endpunkts
    pub fn url(&self) -> String {
        let schema = if self.tls { "wss" } else { "ws" };
        format!("{schema}://{}:{}{}", self.host_fuer_adresse(), self.port, self.pfad)
    }

    /// `host:port` fuer den TCP-Verbindungsaufbau
    pub fn adresse(&self) -> String {
        format!("{}:{}", self.host_fuer_adresse(), self.port)
    }

    pub fn wiederverbinden_nach(&self) -> Duration {
        Duration::from_millis(self.wiederverbinden_ms)
    }

    pub fn verbindungs_timeout(&self) -> Duration {
        Duration::from_millis(self.verbindungs_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_ist_valide() {
        let k = ClientKonfig::default();
        assert!(k.validieren().is_ok());
        assert_eq!(k.url(), "wss://localhost:8765/");
        assert_eq!(k.wiederverbinden_nach(), Duration::from_secs(5));
        assert!(!k.unsichere_zertifikate);
    }

    #[test]
    fn wartezeit_null_wird_abgelehnt() {
        let k = ClientKonfig {
            wiederverbinden_ms: 0,
            ..ClientKonfig::default()
        };
        assert!(matches!(k.validieren(), Err(ClientError::Konfiguration(_))));
    }

    #[test]
    fn ungueltige_felder() {
        assert!(ClientKonfig::ws("", 1).validieren().is_err());
        assert!(ClientKonfig::ws("localhost", 0).validieren().is_err());
        let k = ClientKonfig {
            pfad: "ohne-slash".into(),
            ..ClientKonfig::default()
        };
        assert!(k.validieren().is_err());
    }

    #[test]
    fn ws_url_ohne_tls() {
        assert_eq!(ClientKonfig::ws("10.0.0.5", 8770).url(), "ws://10.0.0.5:8770/");
    }

    #[test]
    fn ipv6_literal_in_klammern() {
        let k = ClientKonfig::ws("::1", 8765);
        assert_eq!(k.url(), "ws://[::1]:8765/");
        assert_eq!(k.adresse(), "[::1]:8765");
        assert!(k.adresse().parse::<std::net::SocketAddr>().is_ok());

        let k = ClientKonfig::ws("leser.local", 8765);
        assert_eq!(k.adresse(), "leser.local:8765");
    }
}
