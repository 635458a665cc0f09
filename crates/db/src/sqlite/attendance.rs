//! SQLite-Implementierung des AttendanceRepository

use chrono::{DateTime, Duration, Utc};
use sqlx::Row;

use crate::models::{AnwesenheitRecord, NeuerAnwesenheitsEintrag, ProtokollErgebnis};
use crate::repository::{AttendanceRepository, DbResult, DUPLIKAT_FENSTER_SEK};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{zeit_formatieren, zeit_parsen};

impl AttendanceRepository for SqliteDb {
    async fn log(
        &self,
        data: NeuerAnwesenheitsEintrag<'_>,
        jetzt: DateTime<Utc>,
    ) -> DbResult<ProtokollErgebnis> {
        // Zeitstempel sind RFC3339 mit fester Millisekunden-Praezision und
        // 'Z', daher ist der String-Vergleich chronologisch korrekt.
        let fenster_start = zeit_formatieren(&(jetzt - Duration::seconds(DUPLIKAT_FENSTER_SEK)));

        let vorhanden = sqlx::query(
            "SELECT id, student_id, full_name, instructor, section, lab_name, arrival
             FROM attendance_logs
             WHERE student_id = ? AND arrival >= ?
             ORDER BY arrival DESC, id DESC LIMIT 1",
        )
        .bind(data.student_id)
        .bind(&fenster_start)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = vorhanden {
            let eintrag = row_to_anwesenheit(&row)?;
            tracing::debug!(
                student_id = %data.student_id,
                eintrag_id = eintrag.id,
                "Doppelter Anwesenheitseintrag verworfen"
            );
            return Ok(ProtokollErgebnis::Duplikat(eintrag));
        }

        let id = sqlx::query(
            "INSERT INTO attendance_logs
                (student_id, full_name, instructor, section, lab_name, arrival)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(data.student_id)
        .bind(data.full_name)
        .bind(data.instructor)
        .bind(data.section)
        .bind(data.lab_name)
        .bind(zeit_formatieren(&jetzt))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        tracing::debug!(student_id = %data.student_id, id, labor = %data.lab_name, "Anwesenheit protokolliert");

        Ok(ProtokollErgebnis::Eingefuegt(AnwesenheitRecord {
            id,
            student_id: data.student_id.to_string(),
            full_name: data.full_name.to_string(),
            instructor: data.instructor.to_string(),
            section: data.section.to_string(),
            lab_name: data.lab_name.to_string(),
            // Auf die gespeicherte Praezision kuerzen
            arrival: zeit_parsen(&zeit_formatieren(&jetzt), "arrival")?,
        }))
    }

    async fn list(&self, lab_name: Option<&str>, limit: i64) -> DbResult<Vec<AnwesenheitRecord>> {
        let rows = match lab_name {
            Some(lab) => {
                sqlx::query(
                    "SELECT id, student_id, full_name, instructor, section, lab_name, arrival
                     FROM attendance_logs WHERE lab_name = ?
                     ORDER BY arrival DESC, id DESC LIMIT ?",
                )
                .bind(lab)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, student_id, full_name, instructor, section, lab_name, arrival
                     FROM attendance_logs ORDER BY arrival DESC, id DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(row_to_anwesenheit).collect()
    }

    async fn count_for_student(&self, student_id: &str) -> DbResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS anzahl FROM attendance_logs WHERE student_id = ?")
            .bind(student_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("anzahl")?)
    }
}

fn row_to_anwesenheit(row: &sqlx::sqlite::SqliteRow) -> DbResult<AnwesenheitRecord> {
    let arrival: String = row.try_get("arrival")?;
    Ok(AnwesenheitRecord {
        id: row.try_get("id")?,
        student_id: row.try_get("student_id")?,
        full_name: row.try_get("full_name")?,
        instructor: row.try_get("instructor")?,
        section: row.try_get("section")?,
        lab_name: row.try_get("lab_name")?,
        arrival: zeit_parsen(&arrival, "arrival")?,
    })
}
