use std::sync::Arc;

use log::info;
use model::{
    class_event::ClassEventKind,
    clock::Clock,
    errors::LedgerError,
    session::Session,
    slot::{find_conflict, WeeklySlot},
    student::{Status, Student},
};
use mongodb::bson::oid::ObjectId;
use service::{audit::Audit, plans::Plans, reminders::Reminders, students::Students};
use storage::{session::Db, Storage};
use thiserror::Error;
use tx_macro::tx;

pub mod service;

pub use service::reminders::{due_reminders, Notifier, SweepStats};

/// Facade over the stores and services; every interactive mutation is a
/// single transaction against the one affected student.
#[derive(Clone)]
pub struct Ledger {
    pub db: Db,
    pub students: Students,
    pub plans: Plans,
    pub audit: Audit,
    pub reminders: Reminders,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    pub fn new(storage: Storage, clock: Arc<dyn Clock>) -> Self {
        let students = Students::new(storage.students);
        let plans = Plans::new(storage.plans);
        let audit = Audit::new(storage.audit, clock.clone());
        let reminders = Reminders::new(
            students.clone(),
            plans.clone(),
            audit.clone(),
            clock.clone(),
        );
        Ledger {
            db: storage.db,
            students,
            plans,
            audit,
            reminders,
            clock,
        }
    }

    #[tx]
    pub async fn create_student(
        &self,
        session: &mut Session,
        name: String,
        email: Option<String>,
        phone: Option<String>,
    ) -> Result<Student, CreateStudentError> {
        if let Some(email) = email.as_deref() {
            if self.students.store.get_by_email(session, email).await?.is_some() {
                return Err(CreateStudentError::EmailAlreadyTaken);
            }
        }
        let student = Student::new(name, email, phone, self.clock.now());
        self.students.store.insert(session, student.clone()).await?;
        self.audit.create_student(session, student.id).await?;
        Ok(student)
    }

    /// Puts the student on a plan; the balance is seeded from the plan
    /// terms right away.
    #[tx]
    pub async fn enroll_plan(
        &self,
        session: &mut Session,
        student_id: ObjectId,
        plan_id: ObjectId,
    ) -> Result<(), LedgerError> {
        let mut student = self.students.get(session, student_id).await?;
        let plan = self.plans.get(session, plan_id).await?;

        student.enroll(&plan, self.clock.today())?;
        self.students.store.update(session, student).await?;
        self.audit.enroll_plan(session, student_id, plan_id).await?;
        Ok(())
    }

    #[tx]
    pub async fn record_class_event(
        &self,
        session: &mut Session,
        student_id: ObjectId,
        kind: ClassEventKind,
    ) -> Result<ObjectId, LedgerError> {
        let mut student = self.students.get(session, student_id).await?;
        let plan = match student.plan_id {
            Some(plan_id) => Some(self.plans.get(session, plan_id).await?),
            None => None,
        };

        let event_id = student.record_class_event(plan.as_ref(), kind, self.clock.now());
        self.students.store.update(session, student).await?;
        self.audit
            .record_class_event(session, student_id, event_id, kind)
            .await?;
        Ok(event_id)
    }

    #[tx]
    pub async fn remove_class_event(
        &self,
        session: &mut Session,
        student_id: ObjectId,
        event_id: ObjectId,
    ) -> Result<(), LedgerError> {
        let mut student = self.students.get(session, student_id).await?;
        let plan = match student.plan_id {
            Some(plan_id) => Some(self.plans.get(session, plan_id).await?),
            None => None,
        };

        let event = student.remove_class_event(plan.as_ref(), event_id)?;
        self.students.store.update(session, student).await?;
        self.audit
            .remove_class_event(session, student_id, event_id, event.kind)
            .await?;
        Ok(())
    }

    /// Renewal against an explicit plan from the catalog. Nothing is
    /// written when the plan terms are unusable.
    #[tx]
    pub async fn record_payment(
        &self,
        session: &mut Session,
        student_id: ObjectId,
        plan_id: ObjectId,
    ) -> Result<(), LedgerError> {
        let mut student = self.students.get(session, student_id).await?;
        let plan = self.plans.get(session, plan_id).await?;

        student.record_payment(&plan, self.clock.today())?;
        self.students.store.update(session, student).await?;
        self.audit.record_payment(session, student_id, &plan).await?;
        Ok(())
    }

    /// Replaces the student's fixed weekly schedule. Without `force` a
    /// collision with another student's slots rejects the write and
    /// names the other student; `force` records it anyway, so the caller
    /// chooses between hard-block and warn-and-proceed.
    #[tx]
    pub async fn set_schedule(
        &self,
        session: &mut Session,
        student_id: ObjectId,
        slots: Vec<WeeklySlot>,
        force: bool,
    ) -> Result<(), LedgerError> {
        let mut student = self.students.get(session, student_id).await?;

        if !force {
            let roster = self.students.find_all(session).await?;
            let conflict = find_conflict(
                &slots,
                Some(student_id),
                roster
                    .iter()
                    .map(|other| (other.id, other.schedule.as_slice())),
            );
            if let Some(other) = conflict {
                return Err(LedgerError::ScheduleConflict(other));
            }
        }

        student.schedule = slots.clone();
        self.students.store.update(session, student).await?;
        self.audit.set_schedule(session, student_id, slots).await?;
        Ok(())
    }

    /// Speculative conflict probe for a schedule the caller has not
    /// committed yet.
    pub async fn check_schedule(
        &self,
        session: &mut Session,
        slots: &[WeeklySlot],
        exclude: Option<ObjectId>,
    ) -> Result<Option<ObjectId>, eyre::Error> {
        let roster = self.students.find_all(session).await?;
        Ok(find_conflict(
            slots,
            exclude,
            roster
                .iter()
                .map(|other| (other.id, other.schedule.as_slice())),
        ))
    }

    /// Manual access toggle, independent of the billing balance.
    #[tx]
    pub async fn block_student(
        &self,
        session: &mut Session,
        student_id: ObjectId,
        is_active: bool,
    ) -> Result<(), LedgerError> {
        info!("Blocking student {}: is_active={}", student_id, is_active);
        let mut student = self.students.get(session, student_id).await?;
        student.is_active = is_active;
        self.students.store.update(session, student).await?;
        self.audit.block_student(session, student_id, is_active).await?;
        Ok(())
    }

    /// Catalog delete; refused while any student still references the
    /// plan.
    #[tx]
    pub async fn delete_plan(
        &self,
        session: &mut Session,
        plan_id: ObjectId,
    ) -> Result<bool, LedgerError> {
        let roster = self.students.find_all(session).await?;
        if roster.iter().any(|student| student.plan_id == Some(plan_id)) {
            return Ok(false);
        }
        self.plans.store.delete(session, plan_id).await?;
        Ok(true)
    }

    pub async fn student_status(
        &self,
        session: &mut Session,
        student_id: ObjectId,
    ) -> Result<Status, LedgerError> {
        let student = self.students.get(session, student_id).await?;
        let plan = match student.plan_id {
            Some(plan_id) => Some(self.plans.get(session, plan_id).await?),
            None => None,
        };
        Ok(student.status(plan.as_ref(), self.clock.today()))
    }

    /// The scheduled reminder pass; see `Reminders::sweep`.
    pub async fn reminder_sweep(
        &self,
        session: &mut Session,
        notifier: &dyn Notifier,
    ) -> Result<SweepStats, eyre::Error> {
        self.reminders.sweep(session, notifier).await
    }
}

#[derive(Error, Debug)]
pub enum CreateStudentError {
    #[error("Student with this email already exists")]
    EmailAlreadyTaken,
    #[error(transparent)]
    Common(#[from] eyre::Error),
}

impl From<mongodb::error::Error> for CreateStudentError {
    fn from(err: mongodb::error::Error) -> Self {
        CreateStudentError::Common(err.into())
    }
}
