//! TLS-Acceptor fuer den Broadcast-Endpunkt (wss://)
//!
//! Zertifikat und Schluessel kommen als PEM-Dateien aus der Konfiguration.
//! Der Provider wird explizit gesetzt (ring), damit kein prozessweiter
//! Default installiert sein muss.

use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use rustls_pemfile::{certs, private_key};
use tokio_rustls::TlsAcceptor;

use crate::error::{BroadcastError, BroadcastResult};

/// Laedt Zertifikatskette und Schluessel aus PEM-Dateien
pub fn tls_acceptor_laden(
    zertifikat: impl AsRef<Path>,
    schluessel: impl AsRef<Path>,
) -> BroadcastResult<TlsAcceptor> {
    let zert_pem = std::fs::read_to_string(zertifikat.as_ref()).map_err(|e| {
        BroadcastError::tls(format!(
            "Zertifikat '{}' nicht lesbar: {e}",
            zertifikat.as_ref().display()
        ))
    })?;
    let schluessel_pem = std::fs::read_to_string(schluessel.as_ref()).map_err(|e| {
        BroadcastError::tls(format!(
            "Schluessel '{}' nicht lesbar: {e}",
            schluessel.as_ref().display()
        ))
    })?;
    tls_acceptor_aus_pem(&zert_pem, &schluessel_pem)
}

/// Baut einen TlsAcceptor aus PEM-Strings
pub fn tls_acceptor_aus_pem(zert_pem: &str, schluessel_pem: &str) -> BroadcastResult<TlsAcceptor> {
    let kette = zertifikate_parsen(zert_pem)?;
    if kette.is_empty() {
        return Err(BroadcastError::tls("Kein Zertifikat in der PEM-Datei"));
    }
    let schluessel = schluessel_parsen(schluessel_pem)?;

    let config = ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| BroadcastError::tls(e.to_string()))?
    .with_no_client_auth()
    .with_single_cert(kette, schluessel)
    .map_err(|e| BroadcastError::tls(e.to_string()))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn zertifikate_parsen(pem: &str) -> BroadcastResult<Vec<CertificateDer<'static>>> {
    let mut cursor = std::io::Cursor::new(pem.as_bytes());
    certs(&mut cursor)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| BroadcastError::tls(format!("Zertifikat-Parsing fehlgeschlagen: {e}")))
}

fn schluessel_parsen(pem: &str) -> BroadcastResult<PrivateKeyDer<'static>> {
    let mut cursor = std::io::Cursor::new(pem.as_bytes());
    private_key(&mut cursor)
        .map_err(|e| BroadcastError::tls(format!("Schluessel-Parsing fehlgeschlagen: {e}")))?
        .ok_or_else(|| BroadcastError::tls("Kein privater Schluessel gefunden"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
