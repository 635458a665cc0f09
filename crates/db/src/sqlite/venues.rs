//! SQLite-Implementierung des VenueRepository

use labcast_core::VenueId;
use sqlx::Row;

use crate::error::DbError;
use crate::models::VenueRecord;
use crate::repository::{DbResult, VenueRepository};
use crate::sqlite::pool::SqliteDb;

impl VenueRepository for SqliteDb {
    async fn create(&self, name: &str) -> DbResult<VenueRecord> {
        let id = sqlx::query("INSERT INTO venues (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::aus_sqlx(e, format!("Raum '{name}'")))?
            .last_insert_rowid();

        Ok(VenueRecord {
            id: VenueId(id),
            name: name.to_string(),
        })
    }

    async fn get(&self, id: VenueId) -> DbResult<Option<VenueRecord>> {
        let row = sqlx::query("SELECT id, name FROM venues WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_venue(&r)).transpose()
    }

    async fn list(&self) -> DbResult<Vec<VenueRecord>> {
        let rows = sqlx::query("SELECT id, name FROM venues ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_venue).collect()
    }
}

fn row_to_venue(row: &sqlx::sqlite::SqliteRow) -> DbResult<VenueRecord> {
    Ok(VenueRecord {
        id: VenueId(row.try_get("id")?),
        name: row.try_get("name")?,
    })
}
