use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::{decimal::Decimal, errors::LedgerError};

/// Billing plan owned by the trainer. Students reference plans by id and
/// never embed them, so catalog edits only affect future renewals.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Plan {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub price: Decimal,
    pub terms: PlanTerms,
    pub version: u32,
}

impl Plan {
    pub fn new(name: String, price: Decimal, terms: PlanTerms) -> Plan {
        Plan {
            id: ObjectId::new(),
            name,
            price,
            terms,
            version: 0,
        }
    }
}

/// The two billing tracks. Duration plans expire on a due date; session
/// packs meter access by a remaining-session counter.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum PlanTerms {
    Duration { duration_days: u32 },
    SessionPack { session_count: u32 },
}

impl PlanTerms {
    pub fn kind(&self) -> PlanKind {
        match self {
            PlanTerms::Duration { .. } => PlanKind::Duration,
            PlanTerms::SessionPack { .. } => PlanKind::SessionPack,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum PlanKind {
    Duration,
    SessionPack,
}

impl Plan {
    /// Zero-valued terms cannot produce a balance; every transition that
    /// consumes the terms checks this before mutating anything.
    pub fn checked_terms(&self) -> Result<PlanTerms, LedgerError> {
        let valid = match self.terms {
            PlanTerms::Duration { duration_days } => duration_days > 0,
            PlanTerms::SessionPack { session_count } => session_count > 0,
        };
        if valid {
            Ok(self.terms)
        } else {
            Err(LedgerError::InvalidPlanConfiguration { plan_id: self.id })
        }
    }
}
