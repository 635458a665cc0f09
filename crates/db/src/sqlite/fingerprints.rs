//! SQLite-Implementierung des FingerprintRepository

use sqlx::Row;

use crate::error::DbError;
use crate::models::{FingerabdruckRecord, NeuerFingerabdruck};
use crate::repository::{DbResult, FingerprintRepository};
use crate::sqlite::pool::SqliteDb;

impl FingerprintRepository for SqliteDb {
    async fn create(&self, data: NeuerFingerabdruck<'_>) -> DbResult<FingerabdruckRecord> {
        let id = sqlx::query(
            "INSERT INTO fingerprints (employee_no, fingerprint_template) VALUES (?, ?)",
        )
        .bind(data.employee_no)
        .bind(data.fingerprint_template)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::aus_sqlx(e, format!("employee_no {}", data.employee_no)))?
        .last_insert_rowid();

        tracing::debug!(id, employee_no = %data.employee_no, "Fingerabdruck-Vorlage gespeichert");

        Ok(FingerabdruckRecord {
            id,
            employee_no: data.employee_no.to_string(),
            fingerprint_template: data.fingerprint_template.to_string(),
        })
    }

    async fn list(&self) -> DbResult<Vec<FingerabdruckRecord>> {
        let rows = sqlx::query(
            "SELECT id, employee_no, fingerprint_template FROM fingerprints ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(FingerabdruckRecord {
                    id: row.try_get("id")?,
                    employee_no: row.try_get("employee_no")?,
                    fingerprint_template: row.try_get("fingerprint_template")?,
                })
            })
            .collect()
    }
}
