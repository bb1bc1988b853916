//! Der Messenger-Client
//!
//! Baut die Transport-Verbindung auf, treibt die Handshake-Maschine und
//! liefert alles Weitere als Ereignisstrom an die UI. Senden ist erst
//! nach `connected (secured)` erlaubt und wird vorher synchron abgelehnt;
//! der Inhalt laeuft beim Senden durch den Gruppen-Cipher, eingehender
//! `ENC:`-Ciphertext wird vor der Zustellung entschluesselt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use klatsch_crypto::GroupCipher;
use klatsch_protocol::control::user_count_parsen;
use klatsch_protocol::message::{jetzt_ms, ChatMessage};

use crate::error::{ClientError, ClientResult};
use crate::handshake::{
    HandshakeAktion, HandshakeSession, HANDSHAKE_FRIST, STATUS_GETRENNT, STATUS_HELLO_GESENDET,
    STATUS_VERBUNDEN,
};

/// Absender-Name des Clients fuer das HELLO-Envelope
pub const HELLO_ABSENDER: &str = "Client";

/// Kapazitaet des Ereignis- und des Befehlskanals
const KANAL_KAPAZITAET: usize = 64;

/// Ereignisse fuer die UI-Schicht
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEreignis {
    /// Verbindungs- oder Handshake-Status (anzeigefertiger Text)
    StatusGeaendert(String),
    /// Entschluesselte Chat-Nachricht oder Server-Hinweis
    Nachricht(ChatMessage),
    /// Frische Teilnehmerzahl aus USER_COUNT
    NutzerZahl(usize),
}

enum Befehl {
    Senden(ChatMessage),
    Trennen,
}

/// Handle auf eine laufende Client-Verbindung
pub struct MessengerClient {
    befehle: mpsc::Sender<Befehl>,
    fertig: Arc<AtomicBool>,
    cipher: Arc<GroupCipher>,
}

impl MessengerClient {
    /// Verbindet zum Server und startet den Verbindungs-Task
    ///
    /// `ziel_kennung` ist die erwartete Server-Kennung; ohne sie schlaegt
    /// der Handshake sofort fehl, ohne dass ein HELLO gesendet wird.
    pub async fn verbinden(
        url: &str,
        ziel_kennung: Option<String>,
        cipher: Arc<GroupCipher>,
    ) -> ClientResult<(Self, mpsc::Receiver<ClientEreignis>)> {
        let (ws, _antwort) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ClientError::Verbindung(e.to_string()))?;
        info!(url, "Transport-Verbindung steht");

        let (ereignis_tx, ereignis_rx) = mpsc::channel(KANAL_KAPAZITAET);
        let (befehl_tx, befehl_rx) = mpsc::channel(KANAL_KAPAZITAET);
        let fertig = Arc::new(AtomicBool::new(false));

        let session = HandshakeSession::neu(ziel_kennung);
        tokio::spawn(verbindungs_schleife(
            ws,
            session,
            Arc::clone(&cipher),
            ereignis_tx,
            befehl_rx,
            Arc::clone(&fertig),
        ));

        Ok((
            Self {
                befehle: befehl_tx,
                fertig,
                cipher,
            },
            ereignis_rx,
        ))
    }

    /// Handshake abgeschlossen und Verbindung nutzbar?
    pub fn ist_verbunden(&self) -> bool {
        self.fertig.load(Ordering::Acquire)
    }

    /// Reiht eine Chat-Nachricht zum Senden ein
    ///
    /// Vor abgeschlossenem Handshake wird synchron abgelehnt; es verlaesst
    /// dann kein Klartext den Client.
    pub fn senden(&self, anzeigename: &str, text: &str) -> ClientResult<()> {
        if !self.ist_verbunden() {
            return Err(ClientError::HandshakeUnvollstaendig);
        }
        let content = self.cipher.verschluesseln(text);
        let nachricht = ChatMessage::neu(anzeigename, content, jetzt_ms());
        self.befehle
            .try_send(Befehl::Senden(nachricht))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => ClientError::SendeQueueVoll,
                mpsc::error::TrySendError::Closed(_) => ClientError::Beendet,
            })
    }

    /// Baut die Verbindung regulaer ab
    pub async fn trennen(&self) {
        let _ = self.befehle.send(Befehl::Trennen).await;
    }
}

// ---------------------------------------------------------------------------
// Verbindungs-Task
// ---------------------------------------------------------------------------

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

struct Schleife {
    sink: WsSink,
    session: HandshakeSession,
    cipher: Arc<GroupCipher>,
    ereignisse: mpsc::Sender<ClientEreignis>,
    fertig: Arc<AtomicBool>,
}

impl Schleife {
    async fn status(&self, text: &str) {
        let _ = self
            .ereignisse
            .send(ClientEreignis::StatusGeaendert(text.to_string()))
            .await;
    }

    /// Verschickt das HELLO; `false` beendet die Schleife
    async fn eroeffnen(&mut self) -> bool {
        match self.session.beim_oeffnen() {
            HandshakeAktion::HelloSenden { content } => {
                let hello = ChatMessage::neu(HELLO_ABSENDER, content, jetzt_ms());
                let json = match hello.als_json() {
                    Ok(json) => json,
                    Err(e) => {
                        debug!(fehler = %e, "HELLO liess sich nicht serialisieren");
                        return false;
                    }
                };
                if self.sink.send(Message::Text(json)).await.is_err() {
                    return false;
                }
                self.status(STATUS_HELLO_GESENDET).await;
                true
            }
            HandshakeAktion::Fehlschlagen { status } => {
                self.status(&status).await;
                let _ = self.sink.send(Message::Close(None)).await;
                false
            }
            _ => true,
        }
    }

    async fn frist_abgelaufen(&mut self) -> bool {
        if let HandshakeAktion::Fehlschlagen { status } = self.session.beim_frist_ablauf() {
            self.status(&status).await;
            let _ = self.sink.send(Message::Close(None)).await;
            return false;
        }
        true
    }

    /// Verarbeitet einen Text-Frame; `false` beendet die Schleife
    async fn text_verarbeiten(&mut self, text: &str) -> bool {
        let nachricht = match ChatMessage::aus_json(text) {
            Ok(n) => n,
            Err(e) => {
                debug!(fehler = %e, "Unlesbares Envelope verworfen");
                return true;
            }
        };

        match self.session.beim_nachricht(&nachricht.content) {
            HandshakeAktion::Abschliessen { gruppenschluessel } => {
                self.cipher.schluessel_installieren(gruppenschluessel);
                self.fertig.store(true, Ordering::Release);
                self.status(STATUS_VERBUNDEN).await;
                return true;
            }
            HandshakeAktion::Fehlschlagen { status } => {
                self.status(&status).await;
                let _ = self.sink.send(Message::Close(None)).await;
                return false;
            }
            HandshakeAktion::Durchreichen
            | HandshakeAktion::Ignorieren
            | HandshakeAktion::HelloSenden { .. } => {}
        }

        if let Some(anzahl) = user_count_parsen(&nachricht.content) {
            let _ = self.ereignisse.send(ClientEreignis::NutzerZahl(anzahl)).await;
            return true;
        }
        if nachricht.ist_steuernachricht() {
            // Steuerstrings erreichen die UI nie als Chat-Text
            debug!(content = %nachricht.content, "Steuerstring verworfen");
            return true;
        }

        let mut zugestellt = nachricht;
        zugestellt.content = self.cipher.entschluesseln(&zugestellt.content);
        let _ = self
            .ereignisse
            .send(ClientEreignis::Nachricht(zugestellt))
            .await;
        true
    }

    async fn befehl_verarbeiten(&mut self, befehl: Option<Befehl>) -> bool {
        match befehl {
            Some(Befehl::Senden(nachricht)) => match nachricht.als_json() {
                Ok(json) => self.sink.send(Message::Text(json)).await.is_ok(),
                Err(e) => {
                    debug!(fehler = %e, "Ausgehendes Envelope liess sich nicht serialisieren");
                    true
                }
            },
            Some(Befehl::Trennen) | None => {
                let _ = self.sink.send(Message::Close(None)).await;
                false
            }
        }
    }
}

async fn verbindungs_schleife(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    session: HandshakeSession,
    cipher: Arc<GroupCipher>,
    ereignisse: mpsc::Sender<ClientEreignis>,
    mut befehle: mpsc::Receiver<Befehl>,
    fertig: Arc<AtomicBool>,
) {
    let (sink, mut strom) = ws.split();
    let mut schleife = Schleife {
        sink,
        session,
        cipher,
        ereignisse,
        fertig,
    };

    let frist = tokio::time::sleep(HANDSHAKE_FRIST);
    tokio::pin!(frist);

    let mut schliess_code: Option<u16> = None;

    if schleife.eroeffnen().await {
        loop {
            tokio::select! {
                () = &mut frist, if schleife.session.laeuft() => {
                    if !schleife.frist_abgelaufen().await {
                        break;
                    }
                }
                eingang = strom.next() => {
                    match eingang {
                        Some(Ok(Message::Text(text))) => {
                            if !schleife.text_verarbeiten(&text).await {
                                break;
                            }
                        }
                        Some(Ok(Message::Ping(daten))) => {
                            if schleife.sink.send(Message::Pong(daten)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            schliess_code = frame.map(|f| u16::from(f.code));
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            debug!(fehler = %e, "Lesefehler, Verbindung endet");
                            break;
                        }
                        None => break,
                    }
                }
                befehl = befehle.recv() => {
                    if !schleife.befehl_verarbeiten(befehl).await {
                        break;
                    }
                }
            }
        }
    }

    schleife.fertig.store(false, Ordering::Release);
    if schleife.session.ist_abgeschlossen() {
        schleife.status(STATUS_GETRENNT).await;
    } else if let Some(status) = schleife.session.beim_schliessen(schliess_code) {
        schleife.status(&status).await;
    }
}
