//! SQLite-Backend-Implementierungen fuer alle Repository-Traits

pub mod announcement;
pub mod assignments;
pub mod attendance;
pub mod devices;
pub mod fingerprints;
pub mod pool;
pub mod venues;

pub use pool::SqliteDb;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::DbError;
use crate::repository::DbResult;

/// Einheitliches Zeitformat in der Datenbank
///
/// Feste Millisekunden-Praezision mit `Z`, damit der String-Vergleich in
/// SQL der zeitlichen Ordnung entspricht.
pub(crate) fn zeit_formatieren(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn zeit_parsen(s: &str, spalte: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::ungueltige_daten(format!("DateTime in '{spalte}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn zeitformat_ist_lexikographisch_sortierbar() {
        let a = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let b = a + chrono::Duration::milliseconds(1500);
        assert_eq!(zeit_formatieren(&a), "2024-03-01T08:00:00.000Z");
        assert!(zeit_formatieren(&a) < zeit_formatieren(&b));
        assert_eq!(zeit_parsen(&zeit_formatieren(&b), "t").unwrap(), b);
    }

    #[test]
    fn kaputte_zeit_ist_ungueltige_daten() {
        let e = zeit_parsen("gestern", "updated_at").unwrap_err();
        assert!(matches!(e, DbError::UngueltigeDaten(ref msg) if msg.contains("updated_at")));
    }
}
