//! Labcast Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Server.

use anyhow::Result;
use labcast_observability::logging_initialisieren;
use labcast_server::{config::ServerConfig, Server};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("LABCAST_CONFIG").unwrap_or_else(|_| "labcast.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let config = ServerConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Labcast Server wird initialisiert"
    );

    let server = Server::binden(config).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht installiert werden");
            return;
        }
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
        let _ = shutdown_tx.send(true);
    });

    server.starten(shutdown_rx).await
}
