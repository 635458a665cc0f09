//! labcast-server – Bibliotheks-Root
//!
//! Verdrahtet die Subsysteme: Zustandsspeicher, Leser-Endpunkt (Karten-UIDs),
//! Relay-Endpunkt (Steuernachrichten), Karten-Publisher und REST-API.

pub mod config;
pub mod stdin_quelle;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{QuellenTyp, ServerConfig};
use labcast_api::{ApiState, Fassade, IdentitaetsProxy, RestServer, RestServerKonfig};
use labcast_broadcast::{
    tls_acceptor_laden, BroadcastServer, EndpunktOptionen, EventBroadcaster, EventPublisher,
    IdentitySource, NullQuelle,
};
use labcast_db::SqliteDb;
use labcast_observability::HealthState;
use tokio::sync::watch;

/// Tatsaechlich gebundene Adressen (Port 0 in der Konfiguration wird aufgeloest)
#[derive(Debug, Clone, Copy)]
pub struct Adressen {
    pub leser: SocketAddr,
    pub relay: SocketAddr,
    pub api: SocketAddr,
}

/// Haelt den gebundenen, noch nicht laufenden Server zusammen
pub struct Server {
    config: ServerConfig,
    db: SqliteDb,
    health: HealthState,
    leser: BroadcastServer,
    relay: BroadcastServer,
    api: RestServer,
    quelle: Box<dyn IdentitySource>,
}

impl Server {
    /// Oeffnet die Datenbank und bindet alle Sockets
    ///
    /// Reihenfolge:
    /// 1. Datenbank oeffnen (Migrationen)
    /// 2. TLS-Acceptor laden (optional)
    /// 3. Leser- und Relay-Endpunkt binden
    /// 4. REST-API binden
    pub async fn binden(config: ServerConfig) -> Result<Self> {
        config.validieren()?;

        tracing::info!(url = %config.datenbank.url, "Datenbankverbindung wird hergestellt");
        let db = SqliteDb::oeffnen(&config.datenbank_config())
            .await
            .context("Datenbank konnte nicht geoeffnet werden")?;

        let tls = match (&config.netzwerk.tls_zertifikat, &config.netzwerk.tls_schluessel) {
            (Some(zert), Some(schluessel)) => Some(tls_acceptor_laden(zert, schluessel)?),
            _ => None,
        };

        let leser = BroadcastServer::binden(
            config.leser_bind_adresse()?,
            EventBroadcaster::neu(),
            EndpunktOptionen {
                name: "leser".into(),
                relay: false,
                tls: tls.clone(),
                max_abonnenten: config.netzwerk.max_abonnenten,
                ..Default::default()
            },
        )
        .await
        .context("Leser-Endpunkt konnte nicht gebunden werden")?;

        let relay = BroadcastServer::binden(
            config.relay_bind_adresse()?,
            EventBroadcaster::neu(),
            EndpunktOptionen {
                name: "relay".into(),
                relay: true,
                tls,
                max_abonnenten: config.netzwerk.max_abonnenten,
                ..Default::default()
            },
        )
        .await
        .context("Relay-Endpunkt konnte nicht gebunden werden")?;

        let health = HealthState::neu();
        let b = leser.broadcaster().clone();
        health.endpunkt_registrieren("leser", move || b.abonnent_anzahl());
        let b = relay.broadcaster().clone();
        health.endpunkt_registrieren("relay", move || b.abonnent_anzahl());

        let identitaet = if config.identitaet.ist_aktiv() {
            Some(IdentitaetsProxy::neu(&config.identitaet)?)
        } else {
            tracing::info!("Kein Identitaets-Verzeichnis konfiguriert, /identity antwortet 503");
            None
        };

        let api = RestServer::binden(
            &RestServerKonfig {
                bind_addr: config.api_bind_adresse()?,
                cors_origins: config.netzwerk.cors_origins.clone(),
            },
            ApiState::neu(Fassade::neu(db.clone()), identitaet),
            health.clone(),
        )
        .await
        .context("REST-API konnte nicht gebunden werden")?;

        let quelle: Box<dyn IdentitySource> = match config.publisher.quelle {
            QuellenTyp::Stdin => Box::new(stdin_quelle::stdin_quelle()?),
            QuellenTyp::Keine => Box::new(NullQuelle),
        };

        Ok(Self {
            config,
            db,
            health,
            leser,
            relay,
            api,
            quelle,
        })
    }

    /// Ersetzt die konfigurierte Identitaetsquelle
    pub fn mit_quelle(mut self, quelle: Box<dyn IdentitySource>) -> Self {
        self.quelle = quelle;
        self
    }

    pub fn adressen(&self) -> Result<Adressen> {
        Ok(Adressen {
            leser: self.leser.lokale_addr()?,
            relay: self.relay.lokale_addr()?,
            api: self.api.lokale_addr()?,
        })
    }

    pub fn health(&self) -> &HealthState {
        &self.health
    }

    /// Startet alle Subsysteme und laeuft bis `shutdown_rx` auf `true` wechselt
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let adressen = self.adressen()?;
        tracing::info!(
            server_name = %self.config.server.name,
            leser = %adressen.leser,
            relay = %adressen.relay,
            api = %adressen.api,
            quelle = self.quelle.name(),
            "Server startet"
        );

        let publisher = EventPublisher::neu(
            self.quelle,
            self.leser.broadcaster().clone(),
            self.config.publisher_optionen(),
        );
        let ping = db_ueberwachen(
            self.db,
            self.health,
            Duration::from_secs(self.config.datenbank.ping_intervall_sek.max(1)),
            shutdown_rx.clone(),
        );

        let (leser, relay, api, (), ()) = tokio::join!(
            self.leser.starten(shutdown_rx.clone()),
            self.relay.starten(shutdown_rx.clone()),
            self.api.starten(shutdown_rx.clone()),
            publisher.starten(shutdown_rx),
            ping,
        );
        leser.context("Leser-Endpunkt")?;
        relay.context("Relay-Endpunkt")?;
        api.context("REST-API")?;

        tracing::info!("Server beendet");
        Ok(())
    }
}

/// Prueft periodisch die Datenbank und haelt den Health-Status aktuell
async fn db_ueberwachen(
    db: SqliteDb,
    health: HealthState,
    intervall: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(intervall);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let erreichbar = db.ping().await;
                if erreichbar != health.db_verbunden() {
                    if erreichbar {
                        tracing::info!("Datenbank wieder erreichbar");
                    } else {
                        tracing::warn!("Datenbank nicht erreichbar");
                    }
                }
                health.db_status_setzen(erreichbar);
            }
            geaendert = shutdown_rx.changed() => {
                if geaendert.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}
