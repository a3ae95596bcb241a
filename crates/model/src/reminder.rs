use std::fmt::Display;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::PlanKind;

/// Due-date distances (in days) that trigger a reminder, most distant
/// first: the engine fires at most one per sweep.
pub const DUE_SOON_DAYS: [u32; 2] = [3, 1];
/// Remaining-session counts that trigger a reminder, largest first.
pub const SESSIONS_LOW: [u32; 2] = [3, 1];

/// Identity of one reminder trigger point. Marking a key in the ledger
/// makes the `(student, key)` pair fire at most once per balance cycle.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "threshold")]
pub enum ThresholdKey {
    DueInDays { days: u32 },
    SessionsLeft { count: u32 },
}

impl ThresholdKey {
    pub fn track(&self) -> PlanKind {
        match self {
            ThresholdKey::DueInDays { .. } => PlanKind::Duration,
            ThresholdKey::SessionsLeft { .. } => PlanKind::SessionPack,
        }
    }
}

impl Display for ThresholdKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThresholdKey::DueInDays { days: 1 } => write!(f, "duration:1day"),
            ThresholdKey::DueInDays { days } => write!(f, "duration:{}days", days),
            ThresholdKey::SessionsLeft { count } => write!(f, "sessions:{}", count),
        }
    }
}

/// Which reminders have already gone out for the current balance cycle.
/// Entries are appended on confirmed sends only; a renewal resets the
/// renewed track so its thresholds re-arm.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ReminderLedger {
    #[serde(default)]
    entries: Vec<SentReminder>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SentReminder {
    pub key: ThresholdKey,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub sent_at: DateTime<Utc>,
}

impl ReminderLedger {
    pub fn contains(&self, key: ThresholdKey) -> bool {
        self.entries.iter().any(|entry| entry.key == key)
    }

    pub fn mark(&mut self, key: ThresholdKey, sent_at: DateTime<Utc>) {
        if !self.contains(key) {
            self.entries.push(SentReminder { key, sent_at });
        }
    }

    pub fn reset(&mut self, track: PlanKind) {
        self.entries.retain(|entry| entry.key.track() != track);
    }

    pub fn entries(&self) -> &[SentReminder] {
        &self.entries
    }
}

/// A decided-but-not-yet-sent reminder. The engine only produces these;
/// sending and ledger marking are the sweep's job.
#[derive(Debug, Clone)]
pub struct ReminderIntent {
    pub student_id: ObjectId,
    pub key: ThresholdKey,
    pub subject: String,
    pub body: String,
}
