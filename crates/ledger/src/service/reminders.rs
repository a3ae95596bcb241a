use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::NaiveDate;
use eyre::Error;
use log::{error, info};
use model::{
    clock::Clock,
    day::days_until,
    errors::LedgerError,
    plan::{Plan, PlanKind},
    reminder::{ReminderIntent, ThresholdKey, DUE_SOON_DAYS, SESSIONS_LOW},
    session::Session,
    student::{Balance, Student},
};
use mongodb::bson::oid::ObjectId;
use tx_macro::tx;

use super::{audit::Audit, plans::Plans, students::Students};

/// Outbound notification channel. Implementations deliver one message
/// and report success only once the transport accepted it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        email: &str,
        name: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), Error>;
}

/// Decides which students have crossed a notify-worthy threshold.
/// Pure: no sending, no ledger writes. A student yields at most one
/// intent per call; the ledger guarantees each threshold fires once per
/// balance cycle.
pub fn due_reminders(
    students: &[Student],
    plans: &HashMap<ObjectId, Plan>,
    today: NaiveDate,
) -> Vec<ReminderIntent> {
    let mut intents = Vec::new();
    for student in students {
        let Some(plan) = student.plan_id.and_then(|id| plans.get(&id)) else {
            continue;
        };
        let has_contact = student.email.as_deref().is_some_and(|email| !email.is_empty());
        if !has_contact {
            continue;
        }

        let key = match (plan.terms.kind(), student.balance) {
            (PlanKind::Duration, Balance::Duration { due_date }) => {
                let left = days_until(due_date, today);
                DUE_SOON_DAYS
                    .iter()
                    .filter(|&&days| left == days as i64)
                    .map(|&days| ThresholdKey::DueInDays { days })
                    .find(|&key| !student.reminders.contains(key))
            }
            (PlanKind::SessionPack, Balance::SessionPack { remaining }) => {
                SESSIONS_LOW
                    .iter()
                    .filter(|&&count| remaining == count as i32)
                    .map(|&count| ThresholdKey::SessionsLeft { count })
                    .find(|&key| !student.reminders.contains(key))
            }
            _ => None,
        };

        if let Some(key) = key {
            let (subject, body) = render(student, plan, key);
            intents.push(ReminderIntent {
                student_id: student.id,
                key,
                subject,
                body,
            });
        }
    }
    intents
}

fn render(student: &Student, plan: &Plan, key: ThresholdKey) -> (String, String) {
    match key {
        ThresholdKey::DueInDays { days } => (
            format!("Your {} plan expires in {}", plan.name, fmt_days(days)),
            format!(
                "<p>Hi {},</p><p>Your <b>{}</b> plan expires in {}. \
                 Record a payment to keep your spot on the schedule.</p>",
                student.name,
                plan.name,
                fmt_days(days)
            ),
        ),
        ThresholdKey::SessionsLeft { count } => (
            format!("{} left on your {} plan", fmt_sessions(count), plan.name),
            format!(
                "<p>Hi {},</p><p>You have {} left on your <b>{}</b> plan. \
                 Top up to keep training without interruption.</p>",
                student.name,
                fmt_sessions(count),
                plan.name
            ),
        ),
    }
}

fn fmt_days(days: u32) -> String {
    if days == 1 {
        "1 day".to_owned()
    } else {
        format!("{} days", days)
    }
}

fn fmt_sessions(count: u32) -> String {
    if count == 1 {
        "1 session".to_owned()
    } else {
        format!("{} sessions", count)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SweepStats {
    pub intents: usize,
    pub sent: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct Reminders {
    students: Students,
    plans: Plans,
    audit: Audit,
    clock: Arc<dyn Clock>,
}

impl Reminders {
    pub fn new(students: Students, plans: Plans, audit: Audit, clock: Arc<dyn Clock>) -> Self {
        Reminders {
            students,
            plans,
            audit,
            clock,
        }
    }

    /// One reminder pass over the roster. Each intent is sent and marked
    /// on its own: a failure is logged and the loop moves on, so one
    /// student's broken address never blocks the rest. Unmarked
    /// thresholds simply come up again on the next sweep.
    pub async fn sweep(
        &self,
        session: &mut Session,
        notifier: &dyn Notifier,
    ) -> Result<SweepStats, Error> {
        let students = self.students.store.find_with_plan(session).await?;
        let plans: HashMap<ObjectId, Plan> = self
            .plans
            .get_all(session)
            .await?
            .into_iter()
            .map(|plan| (plan.id, plan))
            .collect();

        let intents = due_reminders(&students, &plans, self.clock.today());
        let mut stats = SweepStats {
            intents: intents.len(),
            ..SweepStats::default()
        };

        for intent in intents {
            let Some(student) = students.iter().find(|s| s.id == intent.student_id) else {
                continue;
            };
            let Some(email) = student.email.as_deref() else {
                continue;
            };

            match notifier
                .send(email, &student.name, &intent.subject, &intent.body)
                .await
            {
                Ok(()) => {
                    if let Err(err) = self
                        .mark_sent(session, intent.student_id, intent.key)
                        .await
                    {
                        error!(
                            "Reminder {} sent to {} but not recorded: {:#}",
                            intent.key, intent.student_id, err
                        );
                        stats.failed += 1;
                    } else {
                        stats.sent += 1;
                    }
                }
                Err(err) => {
                    error!(
                        "Failed to send reminder {} to {}: {:#}",
                        intent.key, intent.student_id, err
                    );
                    stats.failed += 1;
                }
            }
        }

        info!(
            "Reminder sweep: {} due, {} sent, {} failed",
            stats.intents, stats.sent, stats.failed
        );
        Ok(stats)
    }

    /// Durable record that this threshold went out, written only after a
    /// confirmed send.
    #[tx]
    async fn mark_sent(
        &self,
        session: &mut Session,
        student_id: ObjectId,
        key: ThresholdKey,
    ) -> Result<(), LedgerError> {
        let mut student = self.students.get(session, student_id).await?;
        student.reminders.mark(key, self.clock.now());
        self.students.store.update(session, student).await?;
        self.audit.reminder_sent(session, student_id, key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone as _, Utc};
    use model::{
        class_event::ClassEventKind,
        day::{add_days, local_midnight},
        decimal::Decimal,
        plan::PlanTerms,
    };

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()
    }

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 1, 9, 0, 0).single().unwrap()
    }

    fn pack_plan(count: u32) -> Plan {
        Plan::new(
            "ten pack".to_owned(),
            Decimal::int(200),
            PlanTerms::SessionPack {
                session_count: count,
            },
        )
    }

    fn duration_plan(days: u32) -> Plan {
        Plan::new(
            "monthly".to_owned(),
            Decimal::int(120),
            PlanTerms::Duration {
                duration_days: days,
            },
        )
    }

    fn enrolled(plan: &Plan) -> Student {
        let mut student = Student::new(
            "Ada".to_owned(),
            Some("ada@example.com".to_owned()),
            None,
            now(),
        );
        student.enroll(plan, today()).unwrap();
        student
    }

    fn catalog(plans: &[&Plan]) -> HashMap<ObjectId, Plan> {
        plans.iter().map(|plan| (plan.id, (*plan).clone())).collect()
    }

    #[test]
    fn test_sessions_threshold_fires_once() {
        let plan = pack_plan(10);
        let mut student = enrolled(&plan);
        student.balance = Balance::SessionPack { remaining: 4 };
        for _ in 0..3 {
            student.record_class_event(Some(&plan), ClassEventKind::Regular, now());
        }

        let plans = catalog(&[&plan]);
        let students = vec![student.clone()];
        let intents = due_reminders(&students, &plans, today());
        assert_eq!(1, intents.len());
        assert_eq!(ThresholdKey::SessionsLeft { count: 1 }, intents[0].key);

        // simulate a confirmed send
        student.reminders.mark(intents[0].key, now());
        let students = vec![student];
        assert!(due_reminders(&students, &plans, today()).is_empty());
    }

    #[test]
    fn test_duration_thresholds_fire_on_separate_sweeps() {
        let plan = duration_plan(30);
        let mut student = enrolled(&plan);
        student.balance = Balance::Duration {
            due_date: local_midnight(add_days(today(), 3)),
        };

        let plans = catalog(&[&plan]);
        let intents = due_reminders(&[student.clone()], &plans, today());
        assert_eq!(1, intents.len());
        assert_eq!(ThresholdKey::DueInDays { days: 3 }, intents[0].key);
        student.reminders.mark(intents[0].key, now());

        // nothing at two days out
        assert!(due_reminders(&[student.clone()], &plans, add_days(today(), 1)).is_empty());

        // a second, independent reminder at one day out
        let intents = due_reminders(&[student.clone()], &plans, add_days(today(), 2));
        assert_eq!(1, intents.len());
        assert_eq!(ThresholdKey::DueInDays { days: 1 }, intents[0].key);
    }

    #[test]
    fn test_marked_threshold_is_idempotent_across_sweeps() {
        let plan = duration_plan(30);
        let mut student = enrolled(&plan);
        student.balance = Balance::Duration {
            due_date: local_midnight(add_days(today(), 1)),
        };
        student
            .reminders
            .mark(ThresholdKey::DueInDays { days: 1 }, now());

        let plans = catalog(&[&plan]);
        for _ in 0..3 {
            assert!(due_reminders(&[student.clone()], &plans, today()).is_empty());
        }
    }

    #[test]
    fn test_renewal_rearms_thresholds() {
        let plan = pack_plan(10);
        let mut student = enrolled(&plan);
        student.balance = Balance::SessionPack { remaining: 3 };
        student
            .reminders
            .mark(ThresholdKey::SessionsLeft { count: 3 }, now());

        let plans = catalog(&[&plan]);
        assert!(due_reminders(&[student.clone()], &plans, today()).is_empty());

        student.record_payment(&plan, today()).unwrap();
        student.balance = Balance::SessionPack { remaining: 3 };
        let intents = due_reminders(&[student], &plans, today());
        assert_eq!(1, intents.len());
    }

    #[test]
    fn test_no_contact_no_intent() {
        let plan = pack_plan(10);
        let mut student = enrolled(&plan);
        student.balance = Balance::SessionPack { remaining: 1 };
        student.email = None;

        let plans = catalog(&[&plan]);
        assert!(due_reminders(&[student.clone()], &plans, today()).is_empty());

        student.email = Some(String::new());
        assert!(due_reminders(&[student], &plans, today()).is_empty());
    }

    #[test]
    fn test_off_threshold_balances_are_silent() {
        let plan = pack_plan(10);
        let plans = catalog(&[&plan]);
        for remaining in [5, 2, 0, -1] {
            let mut student = enrolled(&plan);
            student.balance = Balance::SessionPack { remaining };
            assert!(
                due_reminders(&[student], &plans, today()).is_empty(),
                "no reminder expected at {} remaining",
                remaining
            );
        }
    }

    #[test]
    fn test_rendered_templates_name_student_and_plan() {
        let plan = duration_plan(30);
        let mut student = enrolled(&plan);
        student.balance = Balance::Duration {
            due_date: local_midnight(add_days(today(), 1)),
        };

        let plans = catalog(&[&plan]);
        let intents = due_reminders(&[student], &plans, today());
        assert_eq!(1, intents.len());
        assert!(intents[0].subject.contains("monthly"));
        assert!(intents[0].subject.contains("1 day"));
        assert!(intents[0].body.contains("Ada"));
    }

    #[test]
    fn test_unknown_plan_reference_is_skipped() {
        let plan = pack_plan(10);
        let mut student = enrolled(&plan);
        student.balance = Balance::SessionPack { remaining: 1 };

        // catalog does not contain the referenced plan
        let plans = HashMap::new();
        assert!(due_reminders(&[student], &plans, today()).is_empty());
    }
}
