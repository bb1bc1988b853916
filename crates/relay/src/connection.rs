//! Lebenszyklus einer einzelnen Verbindung
//!
//! Jede akzeptierte Verbindung laeuft in einem eigenen Task mit einer
//! select-Schleife ueber Socket-Eingang, Ausgangs-Queue und Shutdown.
//! Eine Verbindung ist erst nach erfolgreich gesendetem WELCOME
//! authentifiziert; bis dahin wird nichts von ihr weitergeleitet und
//! nichts an sie rundgesendet.

use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use klatsch_core::VerbindungsId;
use klatsch_protocol::control::{HELLO_PRAEFIX, SchliessCode};
use klatsch_protocol::message::ChatMessage;

use crate::broadcast::BroadcastVerteiler;
use crate::handshake::hello_verarbeiten;
use crate::identity::ServerIdentity;
use crate::registry::VerbindungsRegister;

/// Geteilter Kontext aller Verbindungs-Tasks
#[derive(Clone)]
pub(crate) struct VerbindungsKontext {
    pub identitaet: Arc<ServerIdentity>,
    pub register: Arc<VerbindungsRegister>,
    pub verteiler: BroadcastVerteiler,
}

/// Zustand einer Verbindung im Handshake-Lebenszyklus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VerbindungsZustand {
    /// Transport steht, HELLO steht noch aus
    Offen,
    /// WELCOME gesendet, Verbindung nimmt am Chat teil
    Authentifiziert,
}

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

async fn schliessen(sink: &mut WsSink, code: SchliessCode, grund: &'static str) {
    let frame = CloseFrame {
        code: CloseCode::from(code.als_u16()),
        reason: Cow::Borrowed(grund),
    };
    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
        debug!(fehler = %e, "Close-Frame liess sich nicht senden");
    }
}

/// Bedient eine akzeptierte TCP-Verbindung bis zu ihrem Ende
pub(crate) async fn verbindung_verarbeiten(
    kontext: VerbindungsKontext,
    stream: TcpStream,
    adresse: SocketAddr,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!(%adresse, fehler = %e, "WebSocket-Upgrade fehlgeschlagen");
            return;
        }
    };

    let id = VerbindungsId::neu();
    let mut ausgang = kontext.register.registrieren(id);
    let mut zustand = VerbindungsZustand::Offen;
    let (mut sink, mut strom) = ws.split();

    debug!(%id, %adresse, "Verbindung angenommen");

    loop {
        tokio::select! {
            eingang = strom.next() => {
                match eingang {
                    Some(Ok(Message::Text(text))) => {
                        if !nachricht_verarbeiten(&kontext, id, &mut zustand, &mut sink, &text).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(daten))) => {
                        if sink.send(Message::Pong(daten)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Binary/Pong/Frame sind fuer das Protokoll bedeutungslos
                        debug!(%id, "Unerwarteter Frame-Typ ignoriert");
                    }
                    Some(Err(e)) => {
                        debug!(%id, fehler = %e, "Lesefehler, Verbindung endet");
                        break;
                    }
                }
            }
            Some(json) = ausgang.recv() => {
                if let Err(e) = sink.send(Message::Text(json)).await {
                    debug!(%id, fehler = %e, "Schreibfehler, Verbindung endet");
                    break;
                }
            }
            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    schliessen(&mut sink, SchliessCode::Normal, "server shutdown").await;
                    break;
                }
            }
        }
    }

    let war_authentifiziert = kontext.register.entfernen(id);
    if war_authentifiziert {
        if let Err(e) = kontext.verteiler.austritt_ansagen() {
            warn!(%id, fehler = %e, "Austritts-Broadcast fehlgeschlagen");
        }
        info!(%id, "Teilnehmer hat den Chat verlassen");
    } else {
        debug!(%id, "Unauthentifizierte Verbindung beendet");
    }
}

/// Verarbeitet einen eingehenden Text-Frame
///
/// Gibt `false` zurueck wenn die Verbindung beendet werden soll.
async fn nachricht_verarbeiten(
    kontext: &VerbindungsKontext,
    id: VerbindungsId,
    zustand: &mut VerbindungsZustand,
    sink: &mut WsSink,
    text: &str,
) -> bool {
    let mut nachricht = match ChatMessage::aus_json(text) {
        Ok(n) => n,
        Err(e) => {
            // Kein Envelope, kein Fehler-Broadcast: still ignorieren
            debug!(%id, fehler = %e, "Unlesbares Envelope verworfen");
            return true;
        }
    };

    if nachricht.content.starts_with(HELLO_PRAEFIX) {
        return hello_empfangen(kontext, id, zustand, sink, &nachricht.content).await;
    }

    match *zustand {
        VerbindungsZustand::Offen => {
            // Vor dem Handshake wird nichts weitergeleitet
            debug!(%id, "Chat-Nachricht vor Handshake ignoriert");
            true
        }
        VerbindungsZustand::Authentifiziert => {
            if nachricht.ist_steuernachricht() {
                // Clients duerfen keine Steuerstrings rundsenden lassen
                debug!(%id, "Steuerstring von Client verworfen");
                return true;
            }
            nachricht.timestamp_stempeln();
            if let Err(e) = kontext.verteiler.rundsenden(&nachricht) {
                warn!(%id, fehler = %e, "Rundsenden fehlgeschlagen");
            }
            true
        }
    }
}

async fn hello_empfangen(
    kontext: &VerbindungsKontext,
    id: VerbindungsId,
    zustand: &mut VerbindungsZustand,
    sink: &mut WsSink,
    content: &str,
) -> bool {
    if *zustand == VerbindungsZustand::Authentifiziert {
        debug!(%id, "Wiederholtes HELLO ignoriert");
        return true;
    }

    let welcome_content = match hello_verarbeiten(&kontext.identitaet, content) {
        Ok(content) => content,
        Err(ablehnung) => {
            debug!(%id, grund = ablehnung.log_grund(), "Handshake abgelehnt");
            schliessen(sink, ablehnung.schliess_code(), ablehnung.wire_grund()).await;
            return false;
        }
    };

    let welcome = ChatMessage::system(welcome_content);
    let json = match welcome.als_json() {
        Ok(json) => json,
        Err(e) => {
            warn!(%id, fehler = %e, "WELCOME liess sich nicht serialisieren");
            schliessen(sink, SchliessCode::HandshakeFehler, "handshake failure").await;
            return false;
        }
    };
    if let Err(e) = sink.send(Message::Text(json)).await {
        debug!(%id, fehler = %e, "WELCOME liess sich nicht senden");
        return false;
    }

    // Befoerderung erst nach erfolgreich gesendetem WELCOME; so sieht der
    // Client die Nutzerzahl-Ansage nie vor seinem Gruppenschluessel.
    if !kontext.register.authentifizieren(id) {
        debug!(%id, "Verbindung verschwand waehrend des Handshakes");
        return false;
    }
    *zustand = VerbindungsZustand::Authentifiziert;
    info!(%id, "Teilnehmer dem Chat beigetreten");

    if let Err(e) = kontext.verteiler.beitritt_ansagen() {
        warn!(%id, fehler = %e, "Beitritts-Broadcast fehlgeschlagen");
    }
    true
}
