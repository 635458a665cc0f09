//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context};
use labcast_api::IdentitaetKonfig;
use labcast_broadcast::PublisherOptionen;
use labcast_core::NutzlastFormat;
use labcast_db::DatabaseConfig;
use labcast_observability::logging::{log_format_gueltig, log_level_gueltig};
use serde::{Deserialize, Serialize};

/// Erlaubter Bereich fuer das Abfrage-Intervall des Publishers
pub const INTERVALL_MIN_MS: u64 = 250;
pub const INTERVALL_MAX_MS: u64 = 1000;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen (Broadcast-Endpunkte, REST-API, TLS)
    pub netzwerk: NetzwerkEinstellungen,
    /// Datenbank-Einstellungen
    pub datenbank: DatenbankEinstellungen,
    /// Karten-Publisher
    pub publisher: PublisherEinstellungen,
    /// Externes Identitaets-Verzeichnis
    pub identitaet: IdentitaetKonfig,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename fuer Logs
    pub name: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Labcast".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    pub bind_adresse: String,
    /// Port des Leser-Endpunkts (Karten-UIDs)
    pub leser_port: u16,
    /// Port des Relay-Endpunkts (Steuernachrichten der Bedienkonsolen)
    pub relay_port: u16,
    /// Port fuer die REST-API
    pub api_port: u16,
    /// Maximale Abonnenten pro Broadcast-Endpunkt
    pub max_abonnenten: usize,
    /// CORS-Origins fuer REST (leer = alle erlaubt)
    pub cors_origins: Vec<String>,
    /// TLS-Zertifikat-Pfad (leer = ws:// ohne TLS)
    pub tls_zertifikat: Option<String>,
    /// TLS-Schluessel-Pfad
    pub tls_schluessel: Option<String>,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            leser_port: 8765,
            relay_port: 8770,
            api_port: 8080,
            max_abonnenten: labcast_broadcast::server::MAX_ABONNENTEN,
            cors_origins: vec![],
            tls_zertifikat: None,
            tls_schluessel: None,
        }
    }
}

/// Datenbank-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatenbankEinstellungen {
    pub url: String,
    pub max_verbindungen: u32,
    pub wal: bool,
    /// Abstand der Erreichbarkeitspruefung fuer `/health`
    pub ping_intervall_sek: u64,
}

impl Default for DatenbankEinstellungen {
    fn default() -> Self {
        Self {
            url: "sqlite://labcast.db".into(),
            max_verbindungen: 5,
            wal: true,
            ping_intervall_sek: 10,
        }
    }
}

/// Quelle der Karten-UIDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuellenTyp {
    /// Eine UID pro Zeile auf stdin
    Stdin,
    /// Kein Leser angeschlossen
    Keine,
}

/// Karten-Publisher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherEinstellungen {
    pub quelle: QuellenTyp,
    pub intervall_ms: u64,
    /// Ausgehendes Format: "json" (`{"message": ...}`) oder "roh"
    pub format: NutzlastFormat,
}

impl Default for PublisherEinstellungen {
    fn default() -> Self {
        Self {
            quelle: QuellenTyp::Stdin,
            intervall_ms: INTERVALL_MIN_MS,
            format: NutzlastFormat::Json,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => bail!("Konfigurationsdatei '{pfad}' nicht lesbar: {e}"),
        };
        config.validieren()?;
        Ok(config)
    }

    /// Prueft Wertebereiche und Kombinationen
    pub fn validieren(&self) -> anyhow::Result<()> {
        let intervall = self.publisher.intervall_ms;
        if !(INTERVALL_MIN_MS..=INTERVALL_MAX_MS).contains(&intervall) {
            bail!(
                "publisher.intervall_ms muss zwischen {INTERVALL_MIN_MS} und {INTERVALL_MAX_MS} liegen, war {intervall}"
            );
        }
        if self.netzwerk.tls_zertifikat.is_some() != self.netzwerk.tls_schluessel.is_some() {
            bail!("netzwerk.tls_zertifikat und netzwerk.tls_schluessel nur gemeinsam angeben");
        }
        let n = &self.netzwerk;
        if n.leser_port != 0 && (n.leser_port == n.relay_port || n.leser_port == n.api_port) {
            bail!("netzwerk: Ports muessen verschieden sein");
        }
        if n.relay_port != 0 && n.relay_port == n.api_port {
            bail!("netzwerk: Ports muessen verschieden sein");
        }
        if n.max_abonnenten == 0 {
            bail!("netzwerk.max_abonnenten muss groesser als 0 sein");
        }
        if !log_level_gueltig(&self.logging.level) {
            bail!("logging.level ungueltig: {}", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            bail!("logging.format ungueltig: {}", self.logging.format);
        }
        Ok(())
    }

    fn bind_adresse(&self, port: u16) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.netzwerk.bind_adresse, port)
            .parse()
            .with_context(|| format!("Ungueltige Bind-Adresse '{}'", self.netzwerk.bind_adresse))
    }

    /// Bind-Adresse des Leser-Endpunkts
    pub fn leser_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        self.bind_adresse(self.netzwerk.leser_port)
    }

    /// Bind-Adresse des Relay-Endpunkts
    pub fn relay_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        self.bind_adresse(self.netzwerk.relay_port)
    }

    /// Bind-Adresse der REST-API
    pub fn api_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        self.bind_adresse(self.netzwerk.api_port)
    }

    pub fn datenbank_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.datenbank.url.clone(),
            max_verbindungen: self.datenbank.max_verbindungen,
            sqlite_wal: self.datenbank.wal,
        }
    }

    pub fn publisher_optionen(&self) -> PublisherOptionen {
        PublisherOptionen {
            intervall: Duration::from_millis(self.publisher.intervall_ms),
            format: self.publisher.format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        cfg.validieren().unwrap();
        assert_eq!(cfg.netzwerk.leser_port, 8765);
        assert_eq!(cfg.netzwerk.relay_port, 8770);
        assert_eq!(cfg.publisher.intervall_ms, 250);
        assert_eq!(cfg.publisher.format, NutzlastFormat::Json);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn bind_adressen() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.leser_bind_adresse().unwrap().to_string(), "0.0.0.0:8765");
        assert_eq!(cfg.relay_bind_adresse().unwrap().to_string(), "0.0.0.0:8770");
        assert_eq!(cfg.api_bind_adresse().unwrap().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [netzwerk]
            leser_port = 9000

            [publisher]
            quelle = "keine"
            intervall_ms = 500
            format = "roh"

            [identitaet]
            basis_url = "https://verzeichnis.example/api/students"

            [identitaet.headers]
            X-Api-Key = "geheim"
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        cfg.validieren().unwrap();
        assert_eq!(cfg.netzwerk.leser_port, 9000);
        assert_eq!(cfg.publisher.quelle, QuellenTyp::Keine);
        assert_eq!(cfg.publisher.format, NutzlastFormat::Roh);
        assert_eq!(cfg.publisher_optionen().intervall, Duration::from_millis(500));
        assert_eq!(cfg.identitaet.headers["X-Api-Key"], "geheim");
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.netzwerk.relay_port, 8770);
        assert_eq!(cfg.identitaet.timeout_ms, 5000);
    }

    #[test]
    fn intervall_ausserhalb_des_bereichs() {
        let mut cfg = ServerConfig::default();
        cfg.publisher.intervall_ms = 100;
        assert!(cfg.validieren().is_err());
        cfg.publisher.intervall_ms = 1001;
        assert!(cfg.validieren().is_err());
        cfg.publisher.intervall_ms = 1000;
        assert!(cfg.validieren().is_ok());
    }

    #[test]
    fn tls_nur_paarweise() {
        let mut cfg = ServerConfig::default();
        cfg.netzwerk.tls_zertifikat = Some("cert.pem".into());
        assert!(cfg.validieren().is_err());
        cfg.netzwerk.tls_schluessel = Some("key.pem".into());
        assert!(cfg.validieren().is_ok());
    }

    #[test]
    fn gleiche_ports_werden_abgelehnt() {
        let mut cfg = ServerConfig::default();
        cfg.netzwerk.relay_port = cfg.netzwerk.leser_port;
        assert!(cfg.validieren().is_err());
    }

    #[test]
    fn fehlende_datei_liefert_standard() {
        let cfg = ServerConfig::laden("/nicht/vorhanden/labcast.toml").unwrap();
        assert_eq!(cfg.server.name, "Labcast");
    }
}
