//! labcast-db – Zustandsspeicher
//!
//! Repository-Pattern ueber SQLite (sqlx). Die Anzeigen lesen hier ihre
//! Raumzuweisung und die aktuelle Ankuendigung, Bedienkonsolen und Leser
//! schreiben Zuweisungen, Ankuendigungen und Anwesenheitseintraege.
//!
//! ## Nicht-atomare Operationen
//! `VenueAssignmentRepository::assign` und `AttendanceRepository::log` sind
//! zweistufig (Pruefen, dann Schreiben) und ohne gegenseitigen Ausschluss.
//! Zwei gleichzeitige Aufrufer fuer denselben Schluessel koennen beide die
//! Pruefung passieren und beide schreiben.

pub mod error;
pub mod models;
pub mod repository;
pub mod sqlite;

pub use error::DbError;
pub use repository::{
    AnnouncementRepository, AttendanceRepository, DatabaseConfig, DbResult, DeviceRepository,
    FingerprintRepository, VenueAssignmentRepository, VenueRepository, DUPLIKAT_FENSTER_SEK,
};
pub use sqlite::SqliteDb;
