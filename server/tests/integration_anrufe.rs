//! End-to-End Integration: zwei Clients, ein Server, ein Gespraech
//!
//! Faehrt den kompletten Server (TCP-Signaling + UDP-Relay + geteilte
//! Tabellen) auf ephemeren Ports hoch und spielt den Anruf-Lebenszyklus
//! ueber echte `VoipClient`-Instanzen durch, inklusive eines
//! Audio-Chunks durch das Relay.

use fernruf_audio::{CHUNK_SAMPLES, SAMPLE_RATE};
use fernruf_client::{AudioAnschluss, VoipClient};
use fernruf_protocol::{ControlMessage, ErrorCode};
use fernruf_server::{config::FernrufConfig, Server};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

/// Bindet einen Server auf ephemeren Ports und startet ihn
async fn test_server() -> (u16, u16, watch::Sender<bool>) {
    let mut config = FernrufConfig::default();
    config.netzwerk.bind_adresse = "127.0.0.1".into();
    config.netzwerk.tcp_port = 0;
    config.netzwerk.udp_port = 0;

    let server = Server::binden(config).await.expect("Server muss binden");
    let tcp_port = server.tcp_adresse().unwrap().port();
    let udp_port = server.udp_adresse().unwrap().port();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(server.starten(shutdown_rx));

    (tcp_port, udp_port, shutdown_tx)
}

async fn verbundener_client(tcp: u16, udp: u16, name: &str) -> (VoipClient, AudioAnschluss) {
    let (mut client, anschluss) = VoipClient::verbinden("127.0.0.1", tcp, udp, name)
        .await
        .expect("Client muss sich verbinden koennen");
    client.registrieren().await.expect("Registrierung muss klappen");
    (client, anschluss)
}

/// 300 Hz Sinus-Chunk, laut genug fuer die Sprach-Erkennung
fn sprach_chunk() -> Vec<f32> {
    (0..CHUNK_SAMPLES)
        .map(|i| {
            0.5 * (2.0 * std::f32::consts::PI * 300.0 * i as f32 / SAMPLE_RATE as f32).sin()
        })
        .collect()
}

async fn ereignis_von(client: &mut VoipClient) -> ControlMessage {
    timeout(Duration::from_secs(2), client.naechstes_ereignis())
        .await
        .expect("Ereignis muss rechtzeitig eintreffen")
        .expect("Verbindung muss offen bleiben")
}

#[tokio::test]
async fn gespraech_zwischen_zwei_clients() {
    let (tcp, udp, _shutdown) = test_server().await;

    let (mut alice, alice_audio) = verbundener_client(tcp, udp, "Alice").await;
    let (mut bob, mut bob_audio) = verbundener_client(tcp, udp, "Bob").await;

    // Alice sieht genau Bob
    let liste = alice.client_liste_anfordern().await.unwrap();
    assert_eq!(liste.len(), 1);
    assert_eq!(liste[0].name, "Bob");
    let bob_id = liste[0].id.clone();

    // Anruf-Anfrage erreicht Bob mit call_id und Absender
    alice.anrufen(&bob_id).await.unwrap();
    let (call_id, von) = match ereignis_von(&mut bob).await {
        ControlMessage::CallRequest(msg) => (msg.call_id.unwrap(), msg.from.unwrap()),
        andere => panic!("CallRequest erwartet, war {}", andere.typ()),
    };
    assert_eq!(&von, alice.id());

    // Bob nimmt an, Alice erfaehrt davon
    bob.annehmen(&call_id).await.unwrap();
    match ereignis_von(&mut alice).await {
        ControlMessage::CallAnswer(msg) => {
            assert!(msg.accepted);
            assert_eq!(msg.from.as_ref(), Some(&bob_id));
            assert_eq!(msg.call_id, call_id);
        }
        andere => panic!("CallAnswer erwartet, war {}", andere.typ()),
    }
    assert!(alice.audio_laeuft());
    assert!(bob.audio_laeuft());

    // Ein Sprach-Chunk von Alice laeuft durchs Relay in Bobs Wiedergabe
    alice_audio.capture_tx.send(sprach_chunk()).await.unwrap();
    let chunk = timeout(Duration::from_secs(2), bob_audio.playback_rx.recv())
        .await
        .expect("Bob muss Audio empfangen")
        .expect("Playback-Queue muss offen sein");
    assert_eq!(chunk.len(), CHUNK_SAMPLES);
}

#[tokio::test]
async fn auflegen_erreicht_die_gegenseite() {
    let (tcp, udp, _shutdown) = test_server().await;

    let (mut alice, _alice_audio) = verbundener_client(tcp, udp, "Alice").await;
    let (mut bob, _bob_audio) = verbundener_client(tcp, udp, "Bob").await;

    let liste = alice.client_liste_anfordern().await.unwrap();
    let bob_id = liste[0].id.clone();

    alice.anrufen(&bob_id).await.unwrap();
    let call_id = match ereignis_von(&mut bob).await {
        ControlMessage::CallRequest(msg) => msg.call_id.unwrap(),
        andere => panic!("CallRequest erwartet, war {}", andere.typ()),
    };
    bob.annehmen(&call_id).await.unwrap();
    ereignis_von(&mut alice).await; // CallAnswer, startet Alices Audio

    alice.auflegen().await.unwrap();
    match ereignis_von(&mut bob).await {
        ControlMessage::CallHangup(msg) => assert_eq!(msg.call_id, call_id),
        andere => panic!("CallHangup erwartet, war {}", andere.typ()),
    }

    assert!(!alice.audio_laeuft());
    assert!(!bob.audio_laeuft());
    assert!(!alice.sitzung().ist_im_anruf());
    assert!(!bob.sitzung().ist_im_anruf());
}

#[tokio::test]
async fn anruf_an_getrennten_client_liefert_fehler() {
    let (tcp, udp, _shutdown) = test_server().await;

    let (mut alice, _alice_audio) = verbundener_client(tcp, udp, "Alice").await;
    let (mut bob, _bob_audio) = verbundener_client(tcp, udp, "Bob").await;

    let liste = alice.client_liste_anfordern().await.unwrap();
    let bob_id = liste[0].id.clone();

    // Bob trennt sich; der Server raeumt asynchron auf
    bob.trennen().await;
    let mut bereinigt = false;
    for _ in 0..100 {
        if alice.client_liste_anfordern().await.unwrap().is_empty() {
            bereinigt = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(bereinigt, "Bobs Eintrag muss nach der Trennung verschwinden");

    alice.anrufen(&bob_id).await.unwrap();
    match ereignis_von(&mut alice).await {
        ControlMessage::Error(fehler) => assert_eq!(fehler.code, ErrorCode::TargetNotFound),
        andere => panic!("Error erwartet, war {}", andere.typ()),
    }

    // Die abgewiesene Anfrage blockiert keinen weiteren Anruf
    assert!(!alice.sitzung().ist_im_anruf());
}
