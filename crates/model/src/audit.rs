use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    class_event::ClassEventKind, decimal::Decimal, reminder::ThresholdKey, slot::WeeklySlot,
};

/// One audit trail row. `actor` is the trainer (or the system actor for
/// background sweeps) taken from the session.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuditRow {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub actor: ObjectId,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date_time: DateTime<Utc>,
    pub action: Action,
}

impl AuditRow {
    pub fn new(actor: ObjectId, date_time: DateTime<Utc>, action: Action) -> AuditRow {
        AuditRow {
            id: ObjectId::new(),
            actor,
            date_time,
            action,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub enum Action {
    CreateStudent {
        student_id: ObjectId,
    },
    EnrollPlan {
        student_id: ObjectId,
        plan_id: ObjectId,
    },
    RecordClassEvent {
        student_id: ObjectId,
        event_id: ObjectId,
        kind: ClassEventKind,
    },
    RemoveClassEvent {
        student_id: ObjectId,
        event_id: ObjectId,
        kind: ClassEventKind,
    },
    RecordPayment {
        student_id: ObjectId,
        plan_id: ObjectId,
        price: Decimal,
    },
    SetSchedule {
        student_id: ObjectId,
        slots: Vec<WeeklySlot>,
    },
    BlockStudent {
        student_id: ObjectId,
        is_active: bool,
    },
    SendReminder {
        student_id: ObjectId,
        key: ThresholdKey,
    },
}
