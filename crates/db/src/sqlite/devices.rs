//! SQLite-Implementierung des DeviceRepository

use chrono::Utc;
use labcast_core::DeviceId;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{GeraetRecord, NeuesGeraet};
use crate::repository::{DbResult, DeviceRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{zeit_formatieren, zeit_parsen};

impl DeviceRepository for SqliteDb {
    async fn create(&self, data: NeuesGeraet<'_>) -> DbResult<GeraetRecord> {
        let now = Utc::now();

        let id = sqlx::query("INSERT INTO devices (name, created_at) VALUES (?, ?)")
            .bind(data.name)
            .bind(zeit_formatieren(&now))
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::aus_sqlx(e, format!("Geraet '{}'", data.name)))?
            .last_insert_rowid();

        tracing::debug!(id, name = data.name, "Geraet registriert");

        Ok(GeraetRecord {
            id: DeviceId(id),
            name: data.name.to_string(),
            created_at: now,
        })
    }

    async fn get(&self, id: DeviceId) -> DbResult<Option<GeraetRecord>> {
        let row = sqlx::query("SELECT id, name, created_at FROM devices WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_geraet(&r)).transpose()
    }

    async fn list(&self) -> DbResult<Vec<GeraetRecord>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM devices ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_geraet).collect()
    }

    async fn delete(&self, id: DeviceId) -> DbResult<bool> {
        let affected = sqlx::query("DELETE FROM devices WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }
}

fn row_to_geraet(row: &sqlx::sqlite::SqliteRow) -> DbResult<GeraetRecord> {
    let created_at: String = row.try_get("created_at")?;
    Ok(GeraetRecord {
        id: DeviceId(row.try_get("id")?),
        name: row.try_get("name")?,
        created_at: zeit_parsen(&created_at, "created_at")?,
    })
}
