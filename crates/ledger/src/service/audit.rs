use std::sync::Arc;

use eyre::Error;
use model::{
    audit::{Action, AuditRow},
    class_event::ClassEventKind,
    clock::Clock,
    plan::Plan,
    reminder::ThresholdKey,
    session::Session,
    slot::WeeklySlot,
};
use mongodb::bson::oid::ObjectId;
use storage::audit::AuditStore;

/// Typed writer for the audit trail; the actor comes from the session.
#[derive(Clone)]
pub struct Audit {
    store: AuditStore,
    clock: Arc<dyn Clock>,
}

impl Audit {
    pub fn new(store: AuditStore, clock: Arc<dyn Clock>) -> Self {
        Audit { store, clock }
    }

    async fn log(&self, session: &mut Session, action: Action) -> Result<(), Error> {
        let row = AuditRow::new(session.actor(), self.clock.now(), action);
        self.store.insert(session, row).await
    }

    pub async fn logs(
        &self,
        session: &mut Session,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<AuditRow>, Error> {
        self.store.get_logs(session, limit, offset).await
    }

    pub async fn create_student(
        &self,
        session: &mut Session,
        student_id: ObjectId,
    ) -> Result<(), Error> {
        self.log(session, Action::CreateStudent { student_id }).await
    }

    pub async fn enroll_plan(
        &self,
        session: &mut Session,
        student_id: ObjectId,
        plan_id: ObjectId,
    ) -> Result<(), Error> {
        self.log(
            session,
            Action::EnrollPlan {
                student_id,
                plan_id,
            },
        )
        .await
    }

    pub async fn record_class_event(
        &self,
        session: &mut Session,
        student_id: ObjectId,
        event_id: ObjectId,
        kind: ClassEventKind,
    ) -> Result<(), Error> {
        self.log(
            session,
            Action::RecordClassEvent {
                student_id,
                event_id,
                kind,
            },
        )
        .await
    }

    pub async fn remove_class_event(
        &self,
        session: &mut Session,
        student_id: ObjectId,
        event_id: ObjectId,
        kind: ClassEventKind,
    ) -> Result<(), Error> {
        self.log(
            session,
            Action::RemoveClassEvent {
                student_id,
                event_id,
                kind,
            },
        )
        .await
    }

    pub async fn record_payment(
        &self,
        session: &mut Session,
        student_id: ObjectId,
        plan: &Plan,
    ) -> Result<(), Error> {
        self.log(
            session,
            Action::RecordPayment {
                student_id,
                plan_id: plan.id,
                price: plan.price,
            },
        )
        .await
    }

    pub async fn set_schedule(
        &self,
        session: &mut Session,
        student_id: ObjectId,
        slots: Vec<WeeklySlot>,
    ) -> Result<(), Error> {
        self.log(session, Action::SetSchedule { student_id, slots })
            .await
    }

    pub async fn block_student(
        &self,
        session: &mut Session,
        student_id: ObjectId,
        is_active: bool,
    ) -> Result<(), Error> {
        self.log(
            session,
            Action::BlockStudent {
                student_id,
                is_active,
            },
        )
        .await
    }

    pub async fn reminder_sent(
        &self,
        session: &mut Session,
        student_id: ObjectId,
        key: ThresholdKey,
    ) -> Result<(), Error> {
        self.log(session, Action::SendReminder { student_id, key })
            .await
    }
}
