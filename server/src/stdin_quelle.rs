//! Identitaetsquelle ueber stdin
//!
//! Ein eigener Thread liest Zeilen von stdin und reicht sie ueber einen
//! Kanal an eine [`KanalQuelle`] weiter. Jede nicht-leere Zeile ist eine UID.

use std::io::BufRead;

use labcast_broadcast::KanalQuelle;
use tokio::sync::mpsc;

/// Puffer fuer noch nicht abgefragte Zeilen
const ZEILEN_PUFFER: usize = 64;

/// Startet den Lese-Thread und gibt die Quelle zurueck
pub fn stdin_quelle() -> std::io::Result<KanalQuelle> {
    let (tx, rx) = mpsc::channel(ZEILEN_PUFFER);
    std::thread::Builder::new()
        .name("labcast-stdin".into())
        .spawn(move || zeilen_weiterreichen(std::io::stdin().lock(), tx))?;
    Ok(KanalQuelle::neu("stdin", rx))
}

/// Liest bis EOF oder bis der Empfaenger weg ist
fn zeilen_weiterreichen(eingabe: impl BufRead, tx: mpsc::Sender<String>) {
    for zeile in eingabe.lines() {
        let zeile = match zeile {
            Ok(z) => z,
            Err(e) => {
                tracing::warn!(fehler = %e, "stdin nicht lesbar");
                break;
            }
        };
        let uid = zeile.trim();
        if uid.is_empty() {
            continue;
        }
        if tx.blocking_send(uid.to_string()).is_err() {
            break;
        }
    }
    tracing::debug!("stdin-Quelle beendet");
}

#[cfg(test)]
mod tests {
    use super::*;
    use labcast_broadcast::IdentitySource;

    #[tokio::test]
    async fn zeilen_werden_zu_uids() {
        let (tx, rx) = mpsc::channel(8);
        let eingabe = std::io::Cursor::new("04a1b2c3\n\n  deadbeef  \n");
        tokio::task::spawn_blocking(move || zeilen_weiterreichen(eingabe, tx))
            .await
            .unwrap();

        let mut quelle = KanalQuelle::neu("test", rx);
        assert_eq!(quelle.abfragen().await.unwrap().as_deref(), Some("04a1b2c3"));
        assert_eq!(quelle.abfragen().await.unwrap().as_deref(), Some("deadbeef"));
        // Sender beendet: die Quelle meldet einen Fehler statt einer UID
        assert!(quelle.abfragen().await.is_err());
    }
}
