//! Integration-Tests fuer das Anwesenheitsprotokoll (In-Memory SQLite)

use chrono::{Duration, TimeZone, Utc};
use labcast_db::{
    models::{NeuerAnwesenheitsEintrag, ProtokollErgebnis},
    AttendanceRepository, SqliteDb,
};

async fn db() -> SqliteDb {
    SqliteDb::in_memory()
        .await
        .expect("In-Memory DB konnte nicht erstellt werden")
}

fn eintrag<'a>(student_id: &'a str, lab: &'a str) -> NeuerAnwesenheitsEintrag<'a> {
    NeuerAnwesenheitsEintrag {
        student_id,
        full_name: "Ana Cruz",
        instructor: "Reyes",
        section: "BSCS 3A",
        lab_name: lab,
    }
}

#[tokio::test]
async fn zweiter_scan_nach_30s_ist_duplikat() {
    let db = db().await;
    let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

    let erst = AttendanceRepository::log(&db, eintrag("2021-0001", "CL1"), t0)
        .await
        .unwrap();
    assert!(matches!(erst, ProtokollErgebnis::Eingefuegt(_)));

    let zweit = AttendanceRepository::log(&db, eintrag("2021-0001", "CL1"), t0 + Duration::seconds(30))
        .await
        .unwrap();
    assert!(zweit.ist_duplikat());
    assert_eq!(zweit.eintrag().id, erst.eintrag().id);
    assert_eq!(AttendanceRepository::count_for_student(&db, "2021-0001").await.unwrap(), 1);
}

#[tokio::test]
async fn scan_nach_61s_wird_eingefuegt() {
    let db = db().await;
    let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

    AttendanceRepository::log(&db, eintrag("2021-0001", "CL1"), t0)
        .await
        .unwrap();
    let zweit = AttendanceRepository::log(&db, eintrag("2021-0001", "CL1"), t0 + Duration::seconds(61))
        .await
        .unwrap();

    assert!(!zweit.ist_duplikat());
    assert_eq!(zweit.eintrag().arrival, t0 + Duration::seconds(61));
    assert_eq!(AttendanceRepository::count_for_student(&db, "2021-0001").await.unwrap(), 2);
}

#[tokio::test]
async fn genau_60s_zaehlt_noch_als_duplikat() {
    let db = db().await;
    let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

    AttendanceRepository::log(&db, eintrag("s1", "CL1"), t0).await.unwrap();
    let grenze = AttendanceRepository::log(&db, eintrag("s1", "CL1"), t0 + Duration::seconds(60))
        .await
        .unwrap();
    assert!(grenze.ist_duplikat());
}

#[tokio::test]
async fn fenster_gilt_pro_student() {
    let db = db().await;
    let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

    AttendanceRepository::log(&db, eintrag("s1", "CL1"), t0).await.unwrap();
    let anderer = AttendanceRepository::log(&db, eintrag("s2", "CL1"), t0 + Duration::seconds(5))
        .await
        .unwrap();
    assert!(!anderer.ist_duplikat());
}

#[tokio::test]
async fn liste_neueste_zuerst_mit_laborfilter() {
    let db = db().await;
    let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

    AttendanceRepository::log(&db, eintrag("s1", "CL1"), t0).await.unwrap();
    AttendanceRepository::log(&db, eintrag("s2", "CL2"), t0 + Duration::seconds(1))
        .await
        .unwrap();
    AttendanceRepository::log(&db, eintrag("s3", "CL1"), t0 + Duration::seconds(2))
        .await
        .unwrap();

    let alle = AttendanceRepository::list(&db, None, 100).await.unwrap();
    let ids: Vec<_> = alle.iter().map(|e| e.student_id.as_str()).collect();
    assert_eq!(ids, ["s3", "s2", "s1"]);

    let cl1 = AttendanceRepository::list(&db, Some("CL1"), 100).await.unwrap();
    assert_eq!(cl1.len(), 2);
    assert!(cl1.iter().all(|e| e.lab_name == "CL1"));

    let begrenzt = AttendanceRepository::list(&db, None, 1).await.unwrap();
    assert_eq!(begrenzt.len(), 1);
    assert_eq!(begrenzt[0].student_id, "s3");
}
