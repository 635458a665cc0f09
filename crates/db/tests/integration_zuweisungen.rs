//! Integration-Tests fuer Geraete, Raeume und Raumzuweisungen (In-Memory SQLite)

use labcast_core::{DeviceId, VenueId};
use labcast_db::{
    models::{NeuesGeraet, ZuweisungsErgebnis},
    DbError, DeviceRepository, SqliteDb, VenueAssignmentRepository, VenueRepository,
};

async fn db() -> SqliteDb {
    SqliteDb::in_memory()
        .await
        .expect("In-Memory DB konnte nicht erstellt werden")
}

async fn geraet(db: &SqliteDb, name: &str) -> DeviceId {
    DeviceRepository::create(db, NeuesGeraet { name })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn geraet_erstellen_und_laden() {
    let db = db().await;
    let id = geraet(&db, "CL1-Anzeige").await;

    let geladen = DeviceRepository::get(&db, id).await.unwrap().unwrap();
    assert_eq!(geladen.name, "CL1-Anzeige");
    assert!(DeviceRepository::get(&db, DeviceId(999)).await.unwrap().is_none());
    assert_eq!(DeviceRepository::list(&db).await.unwrap().len(), 1);
}

#[tokio::test]
async fn zuweisung_zweimal_ergibt_eine_zeile() {
    let db = db().await;
    let m = geraet(&db, "Anzeige").await;
    let v1 = VenueRepository::create(&db, "CL1").await.unwrap().id;
    let v2 = VenueRepository::create(&db, "CL2").await.unwrap().id;

    let erst = VenueAssignmentRepository::assign(&db, m, v1).await.unwrap();
    assert_eq!(erst, ZuweisungsErgebnis::Eingefuegt);

    let zweit = VenueAssignmentRepository::assign(&db, m, v2).await.unwrap();
    assert_eq!(zweit, ZuweisungsErgebnis::Aktualisiert);

    let alle = VenueAssignmentRepository::list(&db).await.unwrap();
    assert_eq!(alle.len(), 1);
    assert_eq!(alle[0].machine_id, m);
    assert_eq!(alle[0].venue_id, v2);

    let z = VenueAssignmentRepository::get(&db, m).await.unwrap().unwrap();
    assert_eq!(z.venue_id, v2);
}

#[tokio::test]
async fn zuweisung_ohne_geraet_ist_fremdschluessel_fehler() {
    let db = db().await;
    let v = VenueRepository::create(&db, "CL1").await.unwrap().id;

    let err = VenueAssignmentRepository::assign(&db, DeviceId(42), v)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Fremdschluessel(_)), "{err:?}");
    assert!(VenueAssignmentRepository::list(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn zuweisung_auf_unbekannten_raum_schlaegt_fehl() {
    let db = db().await;
    let m = geraet(&db, "Anzeige").await;

    let err = VenueAssignmentRepository::assign(&db, m, VenueId(77))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Fremdschluessel(_)), "{err:?}");
}

#[tokio::test]
async fn geraet_loeschen_entfernt_zuweisung() {
    let db = db().await;
    let m = geraet(&db, "Anzeige").await;
    let v = VenueRepository::create(&db, "CL3").await.unwrap().id;
    VenueAssignmentRepository::assign(&db, m, v).await.unwrap();

    assert!(DeviceRepository::delete(&db, m).await.unwrap());
    assert!(VenueAssignmentRepository::get(&db, m).await.unwrap().is_none());
    assert!(!DeviceRepository::delete(&db, m).await.unwrap());
}

#[tokio::test]
async fn raeume_auflisten() {
    let db = db().await;
    VenueRepository::create(&db, "CL1").await.unwrap();
    let v = VenueRepository::create(&db, "CL2").await.unwrap();

    let alle = VenueRepository::list(&db).await.unwrap();
    assert_eq!(alle.len(), 2);
    assert_eq!(VenueRepository::get(&db, v.id).await.unwrap().unwrap().name, "CL2");
}
