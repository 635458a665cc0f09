//! Durchreichung zum externen Identitaets-Verzeichnis
//!
//! `GET /identity/{uid}` wird als `GET {basis_url}/{uid}` weitergeleitet,
//! ergaenzt um die konfigurierten Header (z.B. Zugangsschluessel). Status
//! und Body der Antwort gehen unveraendert zurueck.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// Maximale Laenge einer UID im Pfad
const MAX_UID_LAENGE: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitaetKonfig {
    /// Basis-URL des Verzeichnisses. Leer = Durchreichung deaktiviert.
    pub basis_url: String,
    /// Header, die jeder Anfrage hinzugefuegt werden
    pub headers: BTreeMap<String, String>,
    pub timeout_ms: u64,
}

impl Default for IdentitaetKonfig {
    fn default() -> Self {
        Self {
            basis_url: String::new(),
            headers: BTreeMap::new(),
            timeout_ms: 5000,
        }
    }
}

impl IdentitaetKonfig {
    pub fn ist_aktiv(&self) -> bool {
        !self.basis_url.trim().is_empty()
    }
}

/// Antwort des Verzeichnisses, unveraendert
#[derive(Debug)]
pub struct DurchgereichteAntwort {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Vec<u8>,
}

pub struct IdentitaetsProxy {
    client: reqwest::Client,
    basis_url: String,
    headers: HeaderMap,
}

impl IdentitaetsProxy {
    pub fn neu(konfig: &IdentitaetKonfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, wert) in &konfig.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| anyhow::anyhow!("Ungueltiger Header-Name '{name}': {e}"))?;
            let mut wert = HeaderValue::from_str(wert)
                .map_err(|e| anyhow::anyhow!("Ungueltiger Wert fuer Header '{name}': {e}"))?;
            wert.set_sensitive(true);
            headers.insert(name, wert);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(konfig.timeout_ms))
            .user_agent(format!("labcast/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            basis_url: konfig.basis_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    pub fn ziel_url(&self, uid: &str) -> String {
        format!("{}/{}", self.basis_url, uid)
    }

    /// Fragt das Verzeichnis nach `uid`
    pub async fn abfragen(&self, uid: &str) -> ApiResult<DurchgereichteAntwort> {
        uid_pruefen(uid)?;

        let antwort = self
            .client
            .get(self.ziel_url(uid))
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(uid, fehler = %e, "Identitaets-Verzeichnis nicht erreichbar");
                ApiError::Upstream(e.to_string())
            })?;

        let status = antwort.status();
        let content_type = antwort.headers().get(reqwest::header::CONTENT_TYPE).cloned();
        let body = antwort
            .bytes()
            .await
            .map_err(|e| ApiError::Upstream(e.to_string()))?
            .to_vec();

        tracing::debug!(uid, status = status.as_u16(), bytes = body.len(), "Identitaet abgefragt");
        Ok(DurchgereichteAntwort {
            status,
            content_type,
            body,
        })
    }
}

/// UIDs sind kurze Hex-/Ausweisnummern; alles andere wuerde den Zielpfad veraendern
fn uid_pruefen(uid: &str) -> ApiResult<()> {
    if uid.is_empty() || uid.len() > MAX_UID_LAENGE {
        return Err(ApiError::validierung("UID leer oder zu lang"));
    }
    if !uid.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ApiError::validierung(format!("UID enthaelt ungueltige Zeichen: {uid}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_zeichen() {
        assert!(uid_pruefen("04a1b2c3").is_ok());
        assert!(uid_pruefen("2021-0001").is_ok());
        assert!(uid_pruefen("").is_err());
        assert!(uid_pruefen("../admin").is_err());
        assert!(uid_pruefen(&"a".repeat(65)).is_err());
    }

    #[test]
    fn ungueltige_header_werden_abgelehnt() {
        let mut konfig = IdentitaetKonfig {
            basis_url: "http://127.0.0.1:1".into(),
            ..Default::default()
        };
        konfig.headers.insert("Bad Header".into(), "x".into());
        assert!(IdentitaetsProxy::neu(&konfig).is_err());
    }

    #[test]
    fn ziel_url_ohne_doppelten_slash() {
        let proxy = IdentitaetsProxy::neu(&IdentitaetKonfig {
            basis_url: "http://verzeichnis.local/api/v1/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(proxy.ziel_url("04a1"), "http://verzeichnis.local/api/v1/04a1");
        assert!(!IdentitaetKonfig::default().ist_aktiv());
    }
}
