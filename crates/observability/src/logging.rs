//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `LC_LOG_LEVEL`: Filter-Direktive (z.B. `info`, `labcast_broadcast=debug`)
//! - `LC_LOG_FORMAT`: Format (text/json)
//!
//! Umgebungsvariablen haben Vorrang vor der Konfigurationsdatei.

use tracing_subscriber::{fmt, EnvFilter};

/// Name der Umgebungsvariable fuer den Log-Filter
pub const LOG_LEVEL_ENV: &str = "LC_LOG_LEVEL";
/// Name der Umgebungsvariable fuer das Log-Format
pub const LOG_FORMAT_ENV: &str = "LC_LOG_FORMAT";

/// Initialisiert das Logging-System.
///
/// Faellt auf `info` / `text` zurueck falls weder Umgebung noch Argumente
/// gueltige Werte liefern. Ein zweiter Aufruf im selben Prozess ist
/// wirkungslos.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = std::env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| format.to_string());

    let ergebnis = match format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        _ => fmt().with_env_filter(filter).with_target(true).try_init(),
    };

    if ergebnis.is_err() {
        tracing::debug!("Logging war bereits initialisiert");
    }
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}
