//! SQLite-Implementierung des VenueAssignmentRepository
//!
//! Die Zuweisung ist ein zweistufiges Upsert (Existenz pruefen, dann
//! UPDATE oder INSERT) ohne Transaktion. Gleichzeitige Aufrufer fuer
//! dasselbe Geraet koennen beide den INSERT-Zweig nehmen.

use chrono::Utc;
use labcast_core::{DeviceId, VenueId};
use sqlx::Row;

use crate::error::DbError;
use crate::models::{ZuweisungRecord, ZuweisungsErgebnis};
use crate::repository::{DbResult, VenueAssignmentRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{zeit_formatieren, zeit_parsen};

impl VenueAssignmentRepository for SqliteDb {
    async fn assign(
        &self,
        machine_id: DeviceId,
        venue_id: VenueId,
    ) -> DbResult<ZuweisungsErgebnis> {
        let now_str = zeit_formatieren(&Utc::now());
        let kontext = format!("{machine_id} -> {venue_id}");

        // Schritt 1: existiert bereits eine Zuweisung?
        let vorhanden = sqlx::query("SELECT 1 FROM venue_assignments WHERE machine_id = ? LIMIT 1")
            .bind(machine_id.0)
            .fetch_optional(&self.pool)
            .await?
            .is_some();

        // Schritt 2: verzweigen
        if vorhanden {
            sqlx::query(
                "UPDATE venue_assignments SET venue_id = ?, updated_at = ? WHERE machine_id = ?",
            )
            .bind(venue_id.0)
            .bind(&now_str)
            .bind(machine_id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::aus_sqlx(e, kontext))?;

            tracing::debug!(%machine_id, %venue_id, "Raumzuweisung aktualisiert");
            Ok(ZuweisungsErgebnis::Aktualisiert)
        } else {
            sqlx::query(
                "INSERT INTO venue_assignments (machine_id, venue_id, updated_at) VALUES (?, ?, ?)",
            )
            .bind(machine_id.0)
            .bind(venue_id.0)
            .bind(&now_str)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::aus_sqlx(e, kontext))?;

            tracing::debug!(%machine_id, %venue_id, "Raumzuweisung angelegt");
            Ok(ZuweisungsErgebnis::Eingefuegt)
        }
    }

    async fn get(&self, machine_id: DeviceId) -> DbResult<Option<ZuweisungRecord>> {
        let row = sqlx::query(
            "SELECT machine_id, venue_id, updated_at FROM venue_assignments
             WHERE machine_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(machine_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_zuweisung(&r)).transpose()
    }

    async fn list(&self) -> DbResult<Vec<ZuweisungRecord>> {
        let rows = sqlx::query(
            "SELECT machine_id, venue_id, updated_at FROM venue_assignments ORDER BY machine_id, id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_zuweisung).collect()
    }
}

fn row_to_zuweisung(row: &sqlx::sqlite::SqliteRow) -> DbResult<ZuweisungRecord> {
    let updated_at: String = row.try_get("updated_at")?;
    Ok(ZuweisungRecord {
        machine_id: DeviceId(row.try_get("machine_id")?),
        venue_id: VenueId(row.try_get("venue_id")?),
        updated_at: zeit_parsen(&updated_at, "updated_at")?,
    })
}
