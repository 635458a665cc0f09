//! Integration-Tests fuer den ReconnectingClient gegen lokale WebSocket-Server

use futures_util::{SinkExt, StreamExt};
use labcast_broadcast::{tls::tls_acceptor_aus_pem, BroadcastServer, EndpunktOptionen, EventBroadcaster};
use labcast_client::{ClientEreignis, ClientError, ClientKonfig, ClientZustand, ReconnectingClient};
use labcast_core::{Nutzlast, NutzlastFormat, Steuerbefehl};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;

// ---------------------------------------------------------------------------
// Test-Server
// ---------------------------------------------------------------------------

/// Nimmt Verbindungen an, schliesst sie nach dem Handshake sofort wieder
async fn schliessender_server() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let annahmen = Arc::new(AtomicUsize::new(0));
    let zaehler = Arc::clone(&annahmen);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            zaehler.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
                let _ = ws.close(None).await;
            }
        }
    });

    (addr, annahmen)
}

/// Eine Verbindung: Nachrichten aus `an_client` werden gesendet, empfangene
/// Texte landen in `vom_client`
async fn steuerbarer_server() -> (
    SocketAddr,
    mpsc::UnboundedSender<String>,
    mpsc::UnboundedReceiver<String>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (an_client_tx, mut an_client_rx) = mpsc::unbounded_channel::<String>();
    let (vom_client_tx, vom_client_rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        loop {
            tokio::select! {
                Some(text) = an_client_rx.recv() => {
                    if ws.send(Message::text(text)).await.is_err() {
                        break;
                    }
                }
                eingehend = ws.next() => match eingehend {
                    Some(Ok(Message::Text(text))) => {
                        let _ = vom_client_tx.send(text.to_string());
                    }
                    Some(Ok(_)) => {}
                    _ => break,
                },
            }
        }
    });

    (addr, an_client_tx, vom_client_rx)
}

/// Eine Verbindung, von der nie gelesen wird; Texte aus `an_client` werden
/// trotzdem gesendet
async fn nie_lesender_server() -> (SocketAddr, mpsc::UnboundedSender<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (an_client_tx, mut an_client_rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(text) = an_client_rx.recv().await {
            if ws.send(Message::text(text)).await.is_err() {
                break;
            }
        }
        let _offen = ws;
        std::future::pending::<()>().await;
    });

    (addr, an_client_tx)
}

/// Adresse, auf der garantiert niemand lauscht
async fn geschlossener_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn konfig(addr: SocketAddr, wiederverbinden_ms: u64) -> ClientKonfig {
    ClientKonfig {
        wiederverbinden_ms,
        verbindungs_timeout_ms: 2000,
        ..ClientKonfig::ws(addr.ip().to_string(), addr.port())
    }
}

async fn naechstes(client: &ReconnectingClient) -> ClientEreignis {
    tokio::time::timeout(Duration::from_secs(5), client.ereignisse().recv())
        .await
        .expect("Timeout beim Warten auf ein Ereignis")
        .expect("Ereignis-Queue geschlossen")
}

async fn warten_auf_zustand(client: &ReconnectingClient, ziel: ClientZustand) {
    loop {
        if naechstes(client).await == ClientEreignis::Zustand(ziel) {
            return;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wiederverbindet_nach_fester_wartezeit() {
    let (addr, annahmen) = schliessender_server().await;
    let mut client = ReconnectingClient::neu(konfig(addr, 200)).unwrap();
    client.starten().unwrap();

    let mut verbindend_zeitpunkte = Vec::new();
    let mut verbunden = 0;
    while verbunden < 3 {
        match naechstes(&client).await {
            ClientEreignis::Zustand(ClientZustand::Verbindend) => {
                verbindend_zeitpunkte.push(Instant::now());
            }
            ClientEreignis::Zustand(ClientZustand::Verbunden) => verbunden += 1,
            _ => {}
        }
    }
    client.stoppen();

    assert!(annahmen.load(Ordering::SeqCst) >= 3);
    assert!(client.verbindungen() >= 3);
    // Zwischen zwei Versuchen liegt mindestens die Wartezeit (mit Toleranz)
    for paar in verbindend_zeitpunkte.windows(2) {
        let abstand = paar[1] - paar[0];
        assert!(abstand >= Duration::from_millis(150), "Abstand zu kurz: {abstand:?}");
        assert!(abstand < Duration::from_millis(700), "Abstand zu lang: {abstand:?}");
    }
}

#[tokio::test]
async fn stopp_waehrend_wartezeit_friert_verbindungszaehler_ein() {
    let (addr, annahmen) = schliessender_server().await;
    let mut client = ReconnectingClient::neu(konfig(addr, 10_000)).unwrap();
    client.starten().unwrap();

    warten_auf_zustand(&client, ClientZustand::Verbunden).await;
    warten_auf_zustand(&client, ClientZustand::Getrennt).await;

    // Jetzt laeuft die Wartezeit von 10 s
    let start = Instant::now();
    client.stoppen();
    assert!(start.elapsed() < Duration::from_secs(2), "Stopp muss die Wartezeit abbrechen");

    let vorher = annahmen.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(annahmen.load(Ordering::SeqCst), vorher);
    assert_eq!(vorher, 1);
    assert_eq!(client.verbindungsversuche(), 1);
    assert_eq!(client.zustand(), ClientZustand::Getrennt);
    assert!(!client.ist_aktiv());
}

#[tokio::test]
async fn senden_ohne_verbindung_schlaegt_sofort_fehl() {
    let addr = geschlossener_port().await;
    let mut client = ReconnectingClient::neu(konfig(addr, 100)).unwrap();

    // Vor dem Start
    assert!(matches!(client.senden("x"), Err(ClientError::NichtVerbunden)));

    client.starten().unwrap();
    let start = Instant::now();
    for _ in 0..10 {
        assert!(matches!(client.senden("x"), Err(ClientError::NichtVerbunden)));
    }
    assert!(start.elapsed() < Duration::from_millis(100));

    // Die Versuchsschleife laeuft unbeeindruckt weiter
    tokio::time::timeout(Duration::from_secs(5), async {
        while client.verbindungsversuche() < 3 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("Client muss weiter Verbindungsversuche unternehmen");
    client.stoppen();
}

#[tokio::test]
async fn empfaengt_in_reihenfolge_und_sendet() {
    let (addr, an_client, mut vom_client) = steuerbarer_server().await;
    let mut client = ReconnectingClient::neu(konfig(addr, 200)).unwrap();
    assert!(client.senden("zu frueh").is_err());

    client.starten().unwrap();
    warten_auf_zustand(&client, ClientZustand::Verbunden).await;

    for i in 0..10 {
        an_client.send(format!("uid-{i}")).unwrap();
    }
    for i in 0..10 {
        assert_eq!(naechstes(&client).await, ClientEreignis::Nachricht(format!("uid-{i}")));
    }

    client.senden("show_schedule").unwrap();
    let empfangen = tokio::time::timeout(Duration::from_secs(5), vom_client.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(empfangen, "show_schedule");

    // Empfang laeuft nach dem Senden weiter
    an_client.send(r#"{"message":"show_announcement"}"#.into()).unwrap();
    let ereignis = naechstes(&client).await;
    assert_eq!(ereignis.steuerbefehl(), Some(Steuerbefehl::ZeigeAnkuendigung));

    client.stoppen();
}

#[tokio::test]
async fn stopp_waehrend_empfang_schliesst_die_verbindung() {
    let (addr, _an_client, mut vom_client) = steuerbarer_server().await;
    let mut client = ReconnectingClient::neu(konfig(addr, 200)).unwrap();
    client.starten().unwrap();
    warten_auf_zustand(&client, ClientZustand::Verbunden).await;

    let start = Instant::now();
    client.stoppen();
    assert!(start.elapsed() < Duration::from_secs(2), "Stopp muss den Empfang abbrechen");

    // Server sieht das Verbindungsende
    let ende = tokio::time::timeout(Duration::from_secs(5), vom_client.recv())
        .await
        .expect("Server hat das Verbindungsende nicht bemerkt");
    assert_eq!(ende, None);
    assert_eq!(client.verbindungsversuche(), 1);
    assert_eq!(client.zustand(), ClientZustand::Getrennt);
}

#[tokio::test]
async fn haengendes_schreiben_blockiert_weder_empfang_noch_stopp() {
    let (addr, an_client) = nie_lesender_server().await;
    let mut client = ReconnectingClient::neu(konfig(addr, 200)).unwrap();
    client.starten().unwrap();
    warten_auf_zustand(&client, ClientZustand::Verbunden).await;

    // Mehr als Socket-Puffer aufnehmen koennen
    let block = "x".repeat(1024 * 1024);
    for _ in 0..64 {
        client.senden(block.clone()).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(300)).await;

    an_client.send("uid-1".into()).unwrap();
    loop {
        match naechstes(&client).await {
            ClientEreignis::Nachricht(text) => {
                assert_eq!(text, "uid-1");
                break;
            }
            ClientEreignis::Zustand(z) => panic!("unerwarteter Zustandswechsel: {z}"),
            _ => {}
        }
    }

    let (fertig_tx, fertig_rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        client.stoppen();
        let _ = fertig_tx.send(client);
    });
    let client = fertig_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("stoppen() haengt bei blockiertem Schreiben");

    assert_eq!(client.zustand(), ClientZustand::Getrennt);
    let mut verworfen = 0;
    while let Ok(ereignis) = client.ereignisse().try_recv() {
        if matches!(ereignis, ClientEreignis::SendenFehlgeschlagen { .. }) {
            verworfen += 1;
        }
    }
    assert!(verworfen > 0, "nicht gesendete Nachrichten muessen gemeldet werden");
}

#[tokio::test]
async fn ungueltige_wartezeit_wird_beim_erzeugen_abgelehnt() {
    let k = ClientKonfig {
        wiederverbinden_ms: 0,
        ..ClientKonfig::ws("127.0.0.1", 9)
    };
    assert!(matches!(
        ReconnectingClient::neu(k),
        Err(ClientError::Konfiguration(_))
    ));
}

#[tokio::test]
async fn end_to_end_ueber_tls_broadcast_endpunkt() {
    let zert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let acceptor = tls_acceptor_aus_pem(&zert.cert.pem(), &zert.key_pair.serialize_pem()).unwrap();

    let broadcaster = EventBroadcaster::neu();
    let server = BroadcastServer::binden(
        "127.0.0.1:0".parse().unwrap(),
        broadcaster.clone(),
        EndpunktOptionen {
            tls: Some(acceptor),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let addr = server.lokale_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let test = async move {
        let mut client = ReconnectingClient::neu(ClientKonfig {
            host: "127.0.0.1".into(),
            port: addr.port(),
            tls: true,
            unsichere_zertifikate: true,
            wiederverbinden_ms: 200,
            ..ClientKonfig::default()
        })
        .unwrap();
        client.starten().unwrap();
        warten_auf_zustand(&client, ClientZustand::Verbunden).await;

        tokio::time::timeout(Duration::from_secs(5), async {
            while broadcaster.abonnent_anzahl() != 1 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        broadcaster.an_alle_senden(&Nutzlast::neu("04a10fff").kodieren(NutzlastFormat::Json));
        let ereignis = naechstes(&client).await;
        assert_eq!(ereignis.nutzlast().unwrap().nachricht, "04a10fff");

        client.stoppen();
        shutdown_tx.send(true).unwrap();
    };

    let (ergebnis, ()) = tokio::join!(server.starten(shutdown_rx), test);
    ergebnis.unwrap();
}

#[test]
fn konfig_aus_toml() {
    let k: ClientKonfig = toml::from_str(
        r#"
            host = "10.0.0.7"
            port = 8770
            tls = false
            wiederverbinden_ms = 2500
        "#,
    )
    .unwrap();
    assert_eq!(k.url(), "ws://10.0.0.7:8770/");
    assert_eq!(k.wiederverbinden_nach(), Duration::from_millis(2500));
    assert!(ReconnectingClient::neu(k).is_ok());
}
