use bson::oid::ObjectId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Common error: {0}")]
    Eyre(#[from] eyre::Error),
    #[error("Student not found: {0}")]
    StudentNotFound(ObjectId),
    #[error("Plan not found: {0}")]
    PlanNotFound(ObjectId),
    #[error("Class event {event_id} not found for student {student_id}")]
    ClassEventNotFound {
        student_id: ObjectId,
        event_id: ObjectId,
    },
    #[error("Plan {plan_id} has no usable terms")]
    InvalidPlanConfiguration { plan_id: ObjectId },
    #[error("Schedule conflicts with student {0}")]
    ScheduleConflict(ObjectId),
    #[error("Mongo error: {0}")]
    MongoError(#[from] mongodb::error::Error),
}
