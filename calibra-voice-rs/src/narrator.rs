//! Announcement orchestration: throttle gate → cancel → compose → speak → record.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Timelike;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::models::{first_name, AggregateStats, EquipmentSnapshot};
use crate::narration::compose;
use crate::speech::SpeechSink;
use crate::status::Period;
use crate::throttle::Throttle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnnounceOutcome {
    /// Already announced in this period today.
    Throttled { period: Period },
    /// No speech engine, or nothing was accepted by it. Not recorded.
    Unavailable { period: Period },
    Announced {
        period: Period,
        utterances: Vec<String>,
        failed: usize,
    },
}

pub struct Narrator {
    sink: Arc<dyn SpeechSink>,
    throttle: Throttle,
    clock: Arc<dyn Clock>,
    // One announce at a time so cancel-then-restart stays atomic.
    announce_lock: Mutex<()>,
}

impl Narrator {
    pub fn new(sink: Arc<dyn SpeechSink>, throttle: Throttle, clock: Arc<dyn Clock>) -> Self {
        Self {
            sink,
            throttle,
            clock,
            announce_lock: Mutex::new(()),
        }
    }

    /// Speak the calibration report for `display_name` unless this period
    /// was already announced today. `force` skips the throttle check.
    pub fn announce(
        &self,
        display_name: &str,
        stats: &AggregateStats,
        items: &[EquipmentSnapshot],
        force: bool,
    ) -> AnnounceOutcome {
        let _guard = self.announce_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let now = self.clock.now();
        let period = Period::from_hour(now.hour());
        let today = now.date();

        if !self.throttle.should_announce(period, today, force) {
            info!("Announcement skipped: {period} of {today} already announced");
            return AnnounceOutcome::Throttled { period };
        }

        if !self.sink.is_available() {
            warn!("Speech engine unavailable, skipping announcement");
            return AnnounceOutcome::Unavailable { period };
        }

        self.sink.cancel_all();

        let utterances = compose(first_name(display_name), period, stats, items);
        let mut failed = 0;
        for (i, text) in utterances.iter().enumerate() {
            match self.sink.enqueue(text) {
                Ok(()) => debug!("Queued utterance {}/{}", i + 1, utterances.len()),
                Err(e) => {
                    failed += 1;
                    warn!("Utterance {}/{} not delivered: {e}", i + 1, utterances.len());
                }
            }
        }

        if failed == utterances.len() {
            warn!("No utterance reached the speech engine, announcement not recorded");
            return AnnounceOutcome::Unavailable { period };
        }

        if let Err(e) = self.throttle.record_announced(period, today) {
            warn!("Failed to record announcement: {e}");
        }

        info!(
            "Announced {} utterances for the {period} ({failed} failed, force={force})",
            utterances.len()
        );
        AnnounceOutcome::Announced {
            period,
            utterances,
            failed,
        }
    }

    /// Stop the current sequence without touching the throttle record.
    pub fn cancel(&self) {
        self.sink.cancel_all();
    }

    pub fn is_speech_available(&self) -> bool {
        self.sink.is_available()
    }

    pub fn last_announced(&self, period: Period) -> Option<String> {
        self.throttle.last_announced(period)
    }
}
