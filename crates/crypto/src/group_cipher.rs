//! Gruppen-Cipher fuer Chat-Inhalte
//!
//! Authentifizierte Verschluesselung (AES-256-GCM) des `content`-Felds.
//! Zwei sich ausschliessende Schluesselquellen:
//! - Passphrase: PBKDF2-HMAC-SHA256 mit festem Salz, einmal pro
//!   Passphrase-Wechsel abgeleitet und gecacht
//! - Installierter Schluessel: roher 256-Bit-Schluessel nach erfolgreichem
//!   Handshake; hat Vorrang und loescht den Passphrase-Modus
//!
//! Ohne aktiven Schluessel sind `verschluesseln`/`entschluesseln`
//! Identitaetsfunktionen. Entschluesselungsfehler geben die Eingabe
//! unveraendert zurueck, damit ein falsch konfigurierter Schluessel die
//! Nachrichtenanzeige nicht abbricht.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use parking_lot::RwLock;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

/// Praefix das Ciphertext von Klartext auf dem Draht unterscheidet
pub const ENC_PRAEFIX: &str = "ENC:";

/// Anwendungsweites, festes PBKDF2-Salz
const PASSPHRASE_SALZ: &[u8] = b"KlatschFixedSaltV1";

/// PBKDF2-Iterationen (Wert der Ursprungs-Anwendung)
const PBKDF2_ITERATIONEN: u32 = 65_536;

/// Nonce-Laenge fuer AES-256-GCM (96 Bit)
const NONCE_LAENGE: usize = 12;

/// Aktive Schluesselquelle des Ciphers
enum SchluesselQuelle {
    /// Kein Schluessel aktiv, Cipher arbeitet im Durchreich-Modus
    Keiner,
    /// Aus einer Passphrase abgeleitet (gecacht bis zum Wechsel)
    Passphrase {
        passphrase: String,
        schluessel: [u8; 32],
    },
    /// Roher Schluessel, nach dem Handshake installiert
    Installiert([u8; 32]),
}

impl SchluesselQuelle {
    fn aktiver_schluessel(&self) -> Option<[u8; 32]> {
        match self {
            SchluesselQuelle::Keiner => None,
            SchluesselQuelle::Passphrase { schluessel, .. } => Some(*schluessel),
            SchluesselQuelle::Installiert(schluessel) => Some(*schluessel),
        }
    }
}

/// Cipher-Kontext einer Verbindung bzw. Session
///
/// Explizites Objekt statt globalem Zustand: jede Verbindung besitzt
/// ihren eigenen Kontext, Tests koennen getrennte Schluessel verwenden.
/// Der Lock wird nur um Schluessel-Ableitung und -Installation gehalten;
/// Verschluesselungs-Operationen lesen einen konsistenten Snapshot.
pub struct GroupCipher {
    quelle: RwLock<SchluesselQuelle>,
}

impl GroupCipher {
    /// Erstellt einen Cipher ohne aktiven Schluessel
    pub fn neu() -> Self {
        Self {
            quelle: RwLock::new(SchluesselQuelle::Keiner),
        }
    }

    /// Setzt die Passphrase und leitet den Schluessel ab
    ///
    /// Eine leere Passphrase loescht den Passphrase-Modus. Dieselbe
    /// Passphrase erneut zu setzen leitet nicht neu ab.
    pub fn passphrase_setzen(&self, passphrase: &str) {
        if passphrase.is_empty() {
            self.passphrase_loeschen();
            return;
        }

        let mut quelle = self.quelle.write();
        if let SchluesselQuelle::Passphrase { passphrase: alte, .. } = &*quelle {
            if alte == passphrase {
                return;
            }
        }

        let schluessel = passphrase_ableiten(passphrase);
        *quelle = SchluesselQuelle::Passphrase {
            passphrase: passphrase.to_string(),
            schluessel,
        };
    }

    /// Loescht den Passphrase-Modus (und jeden abgeleiteten Schluessel)
    pub fn passphrase_loeschen(&self) {
        let mut quelle = self.quelle.write();
        if matches!(*quelle, SchluesselQuelle::Passphrase { .. }) {
            *quelle = SchluesselQuelle::Keiner;
        }
    }

    /// Installiert einen rohen 256-Bit-Schluessel (nach dem Handshake)
    ///
    /// Hat Vorrang vor dem Passphrase-Modus und loescht ihn.
    pub fn schluessel_installieren(&self, schluessel: [u8; 32]) {
        *self.quelle.write() = SchluesselQuelle::Installiert(schluessel);
    }

    /// Entfernt jeden aktiven Schluessel
    pub fn schluessel_loeschen(&self) {
        *self.quelle.write() = SchluesselQuelle::Keiner;
    }

    /// Prueft ob ein Schluessel aktiv ist
    pub fn ist_aktiv(&self) -> bool {
        self.quelle.read().aktiver_schluessel().is_some()
    }

    /// Verschluesselt einen Klartext
    ///
    /// Ohne aktiven Schluessel oder bei leerem Klartext wird die Eingabe
    /// unveraendert zurueckgegeben (Durchreich-Modus, kein Fehler).
    pub fn verschluesseln(&self, klartext: &str) -> String {
        let Some(schluessel) = self.quelle.read().aktiver_schluessel() else {
            return klartext.to_string();
        };
        if klartext.is_empty() {
            return klartext.to_string();
        }

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&schluessel));
        let mut nonce_bytes = [0u8; NONCE_LAENGE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        match cipher.encrypt(nonce, klartext.as_bytes()) {
            Ok(ciphertext) => {
                let mut daten = Vec::with_capacity(NONCE_LAENGE + ciphertext.len());
                daten.extend_from_slice(&nonce_bytes);
                daten.extend_from_slice(&ciphertext);
                format!("{ENC_PRAEFIX}{}", BASE64.encode(daten))
            }
            // AES-GCM schlaegt fuer gueltige Schluessel praktisch nie fehl
            Err(_) => klartext.to_string(),
        }
    }

    /// Entschluesselt einen moeglichen Ciphertext
    ///
    /// Ohne aktiven Schluessel oder ohne `ENC:`-Praefix wird die Eingabe
    /// unveraendert zurueckgegeben. Auch bei fehlgeschlagener
    /// Authentifizierung oder fehlerhafter Kodierung kommt die
    /// Original-Eingabe zurueck ("konnte nicht entschluesseln" ist kein
    /// fataler Fehler).
    pub fn entschluesseln(&self, eingabe: &str) -> String {
        let Some(schluessel) = self.quelle.read().aktiver_schluessel() else {
            return eingabe.to_string();
        };
        let Some(b64) = eingabe.strip_prefix(ENC_PRAEFIX) else {
            return eingabe.to_string();
        };

        let Ok(daten) = BASE64.decode(b64) else {
            return eingabe.to_string();
        };
        if daten.len() <= NONCE_LAENGE {
            return eingabe.to_string();
        }

        let (nonce_bytes, ciphertext) = daten.split_at(NONCE_LAENGE);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&schluessel));
        let nonce = Nonce::from_slice(nonce_bytes);

        match cipher.decrypt(nonce, ciphertext) {
            Ok(klartext) => String::from_utf8(klartext).unwrap_or_else(|_| eingabe.to_string()),
            Err(_) => eingabe.to_string(),
        }
    }
}

impl Default for GroupCipher {
    fn default() -> Self {
        Self::neu()
    }
}

/// PBKDF2-HMAC-SHA256 Ableitung aus der Passphrase (256-Bit-Ausgabe)
fn passphrase_ableiten(passphrase: &str) -> [u8; 32] {
    let mut schluessel = [0u8; 32];
    pbkdf2_hmac::<Sha256>(
        passphrase.as_bytes(),
        PASSPHRASE_SALZ,
        PBKDF2_ITERATIONEN,
        &mut schluessel,
    );
    schluessel
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
