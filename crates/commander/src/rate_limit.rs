//! Rate Limiter fuer Textbefehle
//!
//! Jeder Benutzer hat ein Kontingent von `befehle_pro_minute` Befehlen, das
//! kontinuierlich nachwaechst (Token-Bucket). Ein voller Burst ist sofort
//! moeglich, danach ein Befehl alle `60 / befehle_pro_minute` Sekunden.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use esportbot_core::UserId;
use parking_lot::Mutex;
use serde::Deserialize;

/// Kontingente ohne Befehl seit dieser Zeit verwirft `cleanup`
const INAKTIV_NACH: Duration = Duration::from_secs(5 * 60);

/// `[commander]`-Abschnitt der Konfiguration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitKonfig {
    /// Befehle pro Minute und Benutzer (0 wird als 1 behandelt)
    pub befehle_pro_minute: u32,
}

impl Default for RateLimitKonfig {
    fn default() -> Self {
        Self {
            befehle_pro_minute: 10,
        }
    }
}

/// Restkontingent eines Benutzers
#[derive(Debug, Clone, Copy)]
struct Kontingent {
    /// Verfuegbare Befehle, Bruchteile zaehlen mit
    verfuegbar: f64,
    /// Zeitpunkt bis zu dem `verfuegbar` nachgefuellt ist
    stand: Instant,
}

impl Kontingent {
    fn voll(kapazitaet: f64, jetzt: Instant) -> Self {
        Self {
            verfuegbar: kapazitaet,
            stand: jetzt,
        }
    }

    /// Zieht einen Befehl ab oder liefert die Wartezeit bis zum naechsten
    fn anfordern(
        &mut self,
        jetzt: Instant,
        kapazitaet: f64,
        pro_sekunde: f64,
    ) -> Result<(), Duration> {
        let vergangen = jetzt.saturating_duration_since(self.stand).as_secs_f64();
        self.verfuegbar = (self.verfuegbar + vergangen * pro_sekunde).min(kapazitaet);
        self.stand = self.stand.max(jetzt);

        if self.verfuegbar >= 1.0 {
            self.verfuegbar -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - self.verfuegbar) / pro_sekunde))
        }
    }
}

/// Befehls-Limiter mit einem Kontingent pro Benutzer
pub struct RateLimiter {
    kapazitaet: f64,
    pro_sekunde: f64,
    kontingente: Mutex<HashMap<UserId, Kontingent>>,
}

impl RateLimiter {
    pub fn neu(konfig: RateLimitKonfig) -> Arc<Self> {
        let kapazitaet = f64::from(konfig.befehle_pro_minute.max(1));
        Arc::new(Self {
            kapazitaet,
            pro_sekunde: kapazitaet / 60.0,
            kontingente: Mutex::new(HashMap::new()),
        })
    }

    /// Verbucht einen Befehl von `user_id`.
    ///
    /// `Err` enthaelt die Wartezeit in ganzen Sekunden (aufgerundet, mindestens 1).
    pub fn pruefe_benutzer(&self, user_id: UserId) -> Result<(), u64> {
        self.pruefe_benutzer_zu(user_id, Instant::now())
    }

    fn pruefe_benutzer_zu(&self, user_id: UserId, jetzt: Instant) -> Result<(), u64> {
        let mut kontingente = self.kontingente.lock();
        kontingente
            .entry(user_id)
            .or_insert_with(|| Kontingent::voll(self.kapazitaet, jetzt))
            .anfordern(jetzt, self.kapazitaet, self.pro_sekunde)
            .map_err(|warten| warten.as_secs_f64().ceil().max(1.0) as u64)
    }

    /// Verwirft Kontingente von Benutzern ohne Befehl seit 5 Minuten.
    /// Nach so langer Pause waere das Kontingent ohnehin wieder voll.
    pub fn cleanup(&self) {
        self.cleanup_zu(Instant::now());
    }

    fn cleanup_zu(&self, jetzt: Instant) {
        self.kontingente
            .lock()
            .retain(|_, k| jetzt.saturating_duration_since(k.stand) < INAKTIV_NACH);
    }

    /// Anzahl gefuehrter Kontingente
    pub fn bucket_anzahl(&self) -> usize {
        self.kontingente.lock().len()
    }
}
