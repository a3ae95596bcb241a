use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    class_event::{ClassEvent, ClassEventKind},
    day::{add_days, days_until, local_date, local_midnight},
    errors::LedgerError,
    plan::{Plan, PlanKind, PlanTerms},
    reminder::ReminderLedger,
    slot::WeeklySlot,
};

/// The aggregate under management: one student, their plan reference,
/// running balance, attendance history, fixed weekly schedule and the
/// ledger of reminders already sent.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Student {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub plan_id: Option<ObjectId>,
    #[serde(default)]
    pub balance: Balance,
    #[serde(default)]
    pub history: Vec<ClassEvent>,
    #[serde(default)]
    pub reminders: ReminderLedger,
    #[serde(default)]
    pub schedule: Vec<WeeklySlot>,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(default)]
    pub version: u64,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

fn default_is_active() -> bool {
    true
}

/// Which billing track is live. Exactly one of due-date and
/// remaining-sessions is ever meaningful; switching tracks replaces the
/// whole value, so the other side cannot linger.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(tag = "track")]
pub enum Balance {
    #[default]
    Untracked,
    Duration {
        #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
        due_date: DateTime<Utc>,
    },
    SessionPack {
        // may go negative: sessions taken on credit
        remaining: i32,
    },
}

impl Student {
    pub fn new(
        name: String,
        email: Option<String>,
        phone: Option<String>,
        now: DateTime<Utc>,
    ) -> Student {
        Student {
            id: ObjectId::new(),
            name,
            email,
            phone,
            plan_id: None,
            balance: Balance::Untracked,
            history: vec![],
            reminders: ReminderLedger::default(),
            schedule: vec![],
            is_active: true,
            version: 0,
            created_at: now,
        }
    }

    /// Puts the student on a plan and seeds the balance from its terms.
    /// The reminder ledger for the new track starts a fresh cycle.
    pub fn enroll(&mut self, plan: &Plan, today: NaiveDate) -> Result<(), LedgerError> {
        let terms = plan.checked_terms()?;
        self.plan_id = Some(plan.id);
        match terms {
            PlanTerms::Duration { duration_days } => {
                self.balance = Balance::Duration {
                    due_date: local_midnight(add_days(today, duration_days)),
                };
                self.reminders.reset(PlanKind::Duration);
            }
            PlanTerms::SessionPack { session_count } => {
                self.balance = Balance::SessionPack {
                    remaining: session_count as i32,
                };
                self.reminders.reset(PlanKind::SessionPack);
            }
        }
        Ok(())
    }

    /// Appends an attendance row. Regular and Absent burn one session on
    /// a metered session-pack balance; Extra and duration plans leave
    /// the balance alone. Returns the new event id.
    pub fn record_class_event(
        &mut self,
        plan: Option<&Plan>,
        kind: ClassEventKind,
        now: DateTime<Utc>,
    ) -> ObjectId {
        let event = ClassEvent::new(kind, now);
        let event_id = event.id;
        self.history.push(event);

        if kind.burns_session() && on_session_pack(plan) {
            if let Balance::SessionPack { remaining } = &mut self.balance {
                *remaining -= 1;
            }
        }
        event_id
    }

    /// Removes an attendance row and compensates exactly the balance
    /// effect it had. Rows that never charged the balance must not
    /// credit it on removal.
    pub fn remove_class_event(
        &mut self,
        plan: Option<&Plan>,
        event_id: ObjectId,
    ) -> Result<ClassEvent, LedgerError> {
        let index = self
            .history
            .iter()
            .position(|event| event.id == event_id)
            .ok_or(LedgerError::ClassEventNotFound {
                student_id: self.id,
                event_id,
            })?;
        let event = self.history.remove(index);

        if event.kind.burns_session() && on_session_pack(plan) {
            if let Balance::SessionPack { remaining } = &mut self.balance {
                *remaining += 1;
            }
        }
        Ok(event)
    }

    /// The renewal transition. Duration plans extend from whichever is
    /// later, today or the current due date; session packs add the pack
    /// on top of the current counter so owed sessions are settled by the
    /// addition. Either way the other track is cleared and the renewed
    /// track's reminder ledger re-arms. Nothing is touched on invalid
    /// plan terms.
    pub fn record_payment(&mut self, plan: &Plan, today: NaiveDate) -> Result<(), LedgerError> {
        match plan.checked_terms()? {
            PlanTerms::Duration { duration_days } => {
                let base = match self.balance {
                    Balance::Duration { due_date } if local_date(due_date) > today => {
                        local_date(due_date)
                    }
                    _ => today,
                };
                self.balance = Balance::Duration {
                    due_date: local_midnight(add_days(base, duration_days)),
                };
                self.reminders.reset(PlanKind::Duration);
            }
            PlanTerms::SessionPack { session_count } => {
                let prior = match self.balance {
                    Balance::SessionPack { remaining } => remaining,
                    _ => 0,
                };
                self.balance = Balance::SessionPack {
                    remaining: prior + session_count as i32,
                };
                self.reminders.reset(PlanKind::SessionPack);
            }
        }
        Ok(())
    }

    /// Display-level classification; mutates nothing.
    pub fn status(&self, plan: Option<&Plan>, today: NaiveDate) -> Status {
        let Some(plan) = plan else {
            return Status::NoPlan;
        };
        match plan.terms.kind() {
            PlanKind::Duration => match self.balance {
                Balance::Duration { due_date } => {
                    let left = days_until(due_date, today);
                    if left < 0 {
                        Status::Expired
                    } else if left <= 7 {
                        Status::ExpiringSoon
                    } else {
                        Status::Active
                    }
                }
                _ => Status::ActiveNoDueDate,
            },
            PlanKind::SessionPack => match self.balance {
                Balance::SessionPack { remaining } => {
                    if remaining < 0 {
                        Status::Owing(remaining.unsigned_abs())
                    } else if remaining == 0 {
                        Status::Depleted
                    } else if remaining <= 3 {
                        Status::LowBalance(remaining as u32)
                    } else {
                        Status::ActiveSessions(remaining as u32)
                    }
                }
                _ => Status::ActiveUntracked,
            },
        }
    }
}

fn on_session_pack(plan: Option<&Plan>) -> bool {
    plan.map(|plan| plan.terms.kind()) == Some(PlanKind::SessionPack)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    NoPlan,
    ActiveNoDueDate,
    Expired,
    ExpiringSoon,
    Active,
    ActiveUntracked,
    Owing(u32),
    Depleted,
    LowBalance(u32),
    ActiveSessions(u32),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Decimal;
    use crate::reminder::ThresholdKey;
    use chrono::TimeZone as _;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).single().unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()
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

    fn pack_plan(count: u32) -> Plan {
        Plan::new(
            "ten pack".to_owned(),
            Decimal::int(200),
            PlanTerms::SessionPack {
                session_count: count,
            },
        )
    }

    fn student() -> Student {
        Student::new("Ada".to_owned(), Some("ada@example.com".to_owned()), None, now())
    }

    #[test]
    fn test_enroll_seeds_duration_balance() {
        let plan = duration_plan(30);
        let mut student = student();
        student.enroll(&plan, today()).unwrap();

        assert_eq!(Some(plan.id), student.plan_id);
        assert_eq!(
            Balance::Duration {
                due_date: local_midnight(NaiveDate::from_ymd_opt(2024, 10, 31).unwrap())
            },
            student.balance
        );
    }

    #[test]
    fn test_enroll_seeds_session_balance() {
        let plan = pack_plan(10);
        let mut student = student();
        student.enroll(&plan, today()).unwrap();
        assert_eq!(Balance::SessionPack { remaining: 10 }, student.balance);
    }

    #[test]
    fn test_record_and_remove_round_trip() {
        let plan = pack_plan(10);
        let mut student = student();
        student.enroll(&plan, today()).unwrap();

        for kind in [
            ClassEventKind::Regular,
            ClassEventKind::Absent,
            ClassEventKind::Extra,
        ] {
            let before = student.balance;
            let event_id = student.record_class_event(Some(&plan), kind, now());
            student.remove_class_event(Some(&plan), event_id).unwrap();
            assert_eq!(before, student.balance, "{} must round-trip", kind);
            assert!(student.history.is_empty());
        }
    }

    #[test]
    fn test_regular_and_absent_burn_extra_does_not() {
        let plan = pack_plan(10);
        let mut student = student();
        student.enroll(&plan, today()).unwrap();

        student.record_class_event(Some(&plan), ClassEventKind::Regular, now());
        student.record_class_event(Some(&plan), ClassEventKind::Absent, now());
        student.record_class_event(Some(&plan), ClassEventKind::Extra, now());

        assert_eq!(Balance::SessionPack { remaining: 8 }, student.balance);
        assert_eq!(3, student.history.len());
    }

    #[test]
    fn test_balance_goes_negative_without_floor() {
        let plan = pack_plan(2);
        let mut student = student();
        student.enroll(&plan, today()).unwrap();

        for _ in 0..4 {
            student.record_class_event(Some(&plan), ClassEventKind::Regular, now());
        }
        assert_eq!(Balance::SessionPack { remaining: -2 }, student.balance);
        assert_eq!(Status::Owing(2), student.status(Some(&plan), today()));
    }

    #[test]
    fn test_duration_plan_ignores_class_events() {
        let plan = duration_plan(30);
        let mut student = student();
        student.enroll(&plan, today()).unwrap();
        let before = student.balance;

        student.record_class_event(Some(&plan), ClassEventKind::Regular, now());
        assert_eq!(before, student.balance);
    }

    #[test]
    fn test_untracked_counter_stays_untracked() {
        let plan = pack_plan(10);
        let mut student = student();
        student.plan_id = Some(plan.id);

        let event_id = student.record_class_event(Some(&plan), ClassEventKind::Regular, now());
        assert_eq!(Balance::Untracked, student.balance);
        student.remove_class_event(Some(&plan), event_id).unwrap();
        assert_eq!(Balance::Untracked, student.balance);
    }

    #[test]
    fn test_remove_unknown_event_fails() {
        let plan = pack_plan(10);
        let mut student = student();
        student.enroll(&plan, today()).unwrap();

        let result = student.remove_class_event(Some(&plan), ObjectId::new());
        assert!(matches!(
            result,
            Err(LedgerError::ClassEventNotFound { .. })
        ));
        assert_eq!(Balance::SessionPack { remaining: 10 }, student.balance);
    }

    #[test]
    fn test_payment_extends_unexpired_due_date() {
        let plan = duration_plan(30);
        let mut student = student();
        student.balance = Balance::Duration {
            due_date: local_midnight(NaiveDate::from_ymd_opt(2024, 10, 11).unwrap()),
        };
        student.plan_id = Some(plan.id);

        student.record_payment(&plan, today()).unwrap();
        assert_eq!(
            Balance::Duration {
                due_date: local_midnight(NaiveDate::from_ymd_opt(2024, 11, 10).unwrap())
            },
            student.balance
        );
    }

    #[test]
    fn test_payment_on_expired_plan_extends_from_today() {
        let plan = duration_plan(30);
        let mut student = student();
        // ten days overdue
        student.balance = Balance::Duration {
            due_date: local_midnight(NaiveDate::from_ymd_opt(2024, 9, 21).unwrap()),
        };
        student.plan_id = Some(plan.id);

        student.record_payment(&plan, today()).unwrap();
        assert_eq!(
            Balance::Duration {
                due_date: local_midnight(NaiveDate::from_ymd_opt(2024, 10, 31).unwrap())
            },
            student.balance
        );
    }

    #[test]
    fn test_double_renewal_adds_duration_twice() {
        let plan = duration_plan(30);
        let mut student = student();
        student.enroll(&plan, today()).unwrap();

        student.record_payment(&plan, today()).unwrap();
        student.record_payment(&plan, today()).unwrap();
        assert_eq!(
            Balance::Duration {
                // 31 + 30 + 30 days out
                due_date: local_midnight(NaiveDate::from_ymd_opt(2024, 12, 30).unwrap())
            },
            student.balance
        );
    }

    #[test]
    fn test_session_payment_settles_debt_by_addition() {
        let plan = pack_plan(10);
        let mut student = student();
        student.balance = Balance::SessionPack { remaining: -3 };
        student.plan_id = Some(plan.id);

        student.record_payment(&plan, today()).unwrap();
        assert_eq!(Balance::SessionPack { remaining: 7 }, student.balance);
    }

    #[test]
    fn test_payment_switches_track_and_clears_other_side() {
        let pack = pack_plan(10);
        let monthly = duration_plan(30);
        let mut student = student();
        student.enroll(&pack, today()).unwrap();

        student.record_payment(&monthly, today()).unwrap();
        assert!(matches!(student.balance, Balance::Duration { .. }));

        student.record_payment(&pack, today()).unwrap();
        // the due date is gone and the counter starts over from zero
        assert_eq!(Balance::SessionPack { remaining: 10 }, student.balance);
    }

    #[test]
    fn test_invalid_plan_leaves_state_untouched() {
        let mut broken = pack_plan(10);
        broken.terms = PlanTerms::SessionPack { session_count: 0 };
        let mut student = student();
        student.balance = Balance::SessionPack { remaining: 4 };
        student
            .reminders
            .mark(ThresholdKey::SessionsLeft { count: 3 }, now());

        let result = student.record_payment(&broken, today());
        assert!(matches!(
            result,
            Err(LedgerError::InvalidPlanConfiguration { .. })
        ));
        assert_eq!(Balance::SessionPack { remaining: 4 }, student.balance);
        assert!(student
            .reminders
            .contains(ThresholdKey::SessionsLeft { count: 3 }));
    }

    #[test]
    fn test_payment_resets_only_renewed_track_ledger() {
        let pack = pack_plan(10);
        let mut student = student();
        student.balance = Balance::SessionPack { remaining: 1 };
        student.plan_id = Some(pack.id);
        student
            .reminders
            .mark(ThresholdKey::SessionsLeft { count: 1 }, now());
        student
            .reminders
            .mark(ThresholdKey::DueInDays { days: 3 }, now());

        student.record_payment(&pack, today()).unwrap();
        assert!(!student
            .reminders
            .contains(ThresholdKey::SessionsLeft { count: 1 }));
        assert!(student
            .reminders
            .contains(ThresholdKey::DueInDays { days: 3 }));
    }

    #[test]
    fn test_status_duration_branches() {
        let plan = duration_plan(30);
        let mut student = student();

        assert_eq!(Status::NoPlan, student.status(None, today()));

        student.plan_id = Some(plan.id);
        assert_eq!(Status::ActiveNoDueDate, student.status(Some(&plan), today()));

        student.balance = Balance::Duration {
            due_date: local_midnight(NaiveDate::from_ymd_opt(2024, 9, 30).unwrap()),
        };
        assert_eq!(Status::Expired, student.status(Some(&plan), today()));

        student.balance = Balance::Duration {
            due_date: local_midnight(NaiveDate::from_ymd_opt(2024, 10, 8).unwrap()),
        };
        assert_eq!(Status::ExpiringSoon, student.status(Some(&plan), today()));

        student.balance = Balance::Duration {
            due_date: local_midnight(NaiveDate::from_ymd_opt(2024, 10, 9).unwrap()),
        };
        assert_eq!(Status::Active, student.status(Some(&plan), today()));
    }

    #[test]
    fn test_status_session_branches() {
        let plan = pack_plan(10);
        let mut student = student();
        student.plan_id = Some(plan.id);

        assert_eq!(
            Status::ActiveUntracked,
            student.status(Some(&plan), today())
        );

        for (remaining, expected) in [
            (-2, Status::Owing(2)),
            (0, Status::Depleted),
            (1, Status::LowBalance(1)),
            (3, Status::LowBalance(3)),
            (4, Status::ActiveSessions(4)),
        ] {
            student.balance = Balance::SessionPack { remaining };
            assert_eq!(expected, student.status(Some(&plan), today()));
        }
    }
}
