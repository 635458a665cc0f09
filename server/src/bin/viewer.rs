//! Labcast Viewer – einfacher Anzeige-Host um den ReconnectingClient
//!
//! Gibt jedes eingehende Event aus (dekodiert und als Steuerbefehl
//! interpretiert) und sendet jede stdin-Zeile an den Endpunkt.
//!
//! Aufruf: `labcast-viewer [viewer.toml]`, ohne Datei `ws://localhost:8765/`.

use std::io::BufRead;

use anyhow::{Context, Result};
use labcast_client::{ClientEreignis, ClientKonfig, ReconnectingClient};
use labcast_core::Steuerbefehl;
use labcast_observability::logging_initialisieren;

fn konfig_laden() -> Result<ClientKonfig> {
    match std::env::args().nth(1) {
        Some(pfad) => {
            let inhalt = std::fs::read_to_string(&pfad)
                .with_context(|| format!("Konfigurationsdatei '{pfad}' nicht lesbar"))?;
            toml::from_str(&inhalt).with_context(|| format!("Konfigurationsfehler in '{pfad}'"))
        }
        None => Ok(ClientKonfig::ws("localhost", 8765)),
    }
}

fn ereignis_ausgeben(ereignis: &ClientEreignis) {
    match ereignis {
        ClientEreignis::Zustand(zustand) => println!("[zustand] {zustand}"),
        ClientEreignis::Nachricht(_) => match ereignis.steuerbefehl() {
            Some(Steuerbefehl::ZeigeStundenplan) => println!("[anzeige] Stundenplan"),
            Some(Steuerbefehl::ZeigeBild) => println!("[anzeige] Bild"),
            Some(Steuerbefehl::ZeigeAnkuendigung) => println!("[anzeige] Ankuendigung"),
            Some(Steuerbefehl::ZeitAnkuendigung {
                nachricht,
                dauer_minuten,
            }) => println!("[anzeige] {nachricht} ({dauer_minuten} min)"),
            Some(Steuerbefehl::Text(text)) => println!("[karte] {text}"),
            None => {}
        },
        ClientEreignis::SendenFehlgeschlagen { nachricht, grund } => {
            eprintln!("[fehler] '{nachricht}' nicht gesendet: {grund}")
        }
    }
}

fn main() -> Result<()> {
    logging_initialisieren("warn", "text");

    let konfig = konfig_laden()?;
    println!("Verbinde mit {}", konfig.url());

    let mut client = ReconnectingClient::neu(konfig)?;
    client.starten()?;

    let ereignisse = client.ereignisse().clone();
    std::thread::Builder::new()
        .name("labcast-viewer-ausgabe".into())
        .spawn(move || {
            while let Ok(ereignis) = ereignisse.recv_blocking() {
                ereignis_ausgeben(&ereignis);
            }
        })?;

    for zeile in std::io::stdin().lock().lines() {
        let zeile = zeile?;
        let text = zeile.trim();
        if text.is_empty() {
            continue;
        }
        if let Err(e) = client.senden(text) {
            eprintln!("[fehler] {e}");
        }
    }

    client.stoppen();
    Ok(())
}
