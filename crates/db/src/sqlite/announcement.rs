//! SQLite-Implementierung des AnnouncementRepository

use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::AnkuendigungRecord;
use crate::repository::{AnnouncementRepository, DbResult};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{zeit_formatieren, zeit_parsen};

const ANKUENDIGUNG_ID: i64 = 1;

impl AnnouncementRepository for SqliteDb {
    async fn get(&self) -> DbResult<AnkuendigungRecord> {
        let row = sqlx::query("SELECT content, is_image, updated_at FROM announcement WHERE id = ?")
            .bind(ANKUENDIGUNG_ID)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::nicht_gefunden("Ankuendigungs-Zeile fehlt (Seed)"))?;

        let updated_at: String = row.try_get("updated_at")?;
        Ok(AnkuendigungRecord {
            content: row.try_get("content")?,
            is_image: row.try_get("is_image")?,
            updated_at: zeit_parsen(&updated_at, "updated_at")?,
        })
    }

    async fn set(&self, content: &str, is_image: bool) -> DbResult<AnkuendigungRecord> {
        let now = Utc::now();

        let affected = sqlx::query(
            "UPDATE announcement SET content = ?, is_image = ?, updated_at = ? WHERE id = ?",
        )
        .bind(content)
        .bind(is_image)
        .bind(zeit_formatieren(&now))
        .bind(ANKUENDIGUNG_ID)
        .execute(&self.pool)
        .await?
        .rows_affected();

        // Vorbedingung verletzt: kein stilles Verwerfen
        if affected == 0 {
            return Err(DbError::nicht_gefunden("Ankuendigungs-Zeile fehlt (Seed)"));
        }

        tracing::debug!(is_image, laenge = content.len(), "Ankuendigung ueberschrieben");

        Ok(AnkuendigungRecord {
            content: content.to_string(),
            is_image,
            updated_at: now,
        })
    }
}
