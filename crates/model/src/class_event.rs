use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of a student's attendance history. Rows are appended and
/// removed whole, never edited; removing a row reverses the balance
/// effect it had.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClassEvent {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub happened_at: DateTime<Utc>,
    pub kind: ClassEventKind,
}

impl ClassEvent {
    pub fn new(kind: ClassEventKind, happened_at: DateTime<Utc>) -> ClassEvent {
        ClassEvent {
            id: ObjectId::new(),
            happened_at,
            kind,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ClassEventKind {
    Regular,
    Extra,
    Absent,
}

impl ClassEventKind {
    /// Missed classes are charged like attended ones; extras are free.
    pub fn burns_session(&self) -> bool {
        matches!(self, ClassEventKind::Regular | ClassEventKind::Absent)
    }
}
