use std::ops::Deref;

use model::{
    decimal::Decimal,
    errors::LedgerError,
    plan::{Plan, PlanTerms},
    session::Session,
};
use mongodb::bson::oid::ObjectId;
use storage::plan::PlanStore;
use thiserror::Error;
use tx_macro::tx;

/// The read-mostly plan catalog.
#[derive(Clone)]
pub struct Plans {
    pub store: PlanStore,
}

impl Plans {
    pub fn new(store: PlanStore) -> Self {
        Plans { store }
    }

    pub async fn get(&self, session: &mut Session, id: ObjectId) -> Result<Plan, LedgerError> {
        self.store
            .get(session, id)
            .await
            .map_err(LedgerError::Eyre)?
            .ok_or(LedgerError::PlanNotFound(id))
    }

    pub async fn get_all(&self, session: &mut Session) -> Result<Vec<Plan>, eyre::Error> {
        self.store.dump(session).await
    }

    #[tx]
    pub async fn create_plan(
        &self,
        session: &mut Session,
        plan: Plan,
    ) -> Result<(), CreatePlanError> {
        if self.store.get_by_name(session, &plan.name).await?.is_some() {
            return Err(CreatePlanError::NameAlreadyExists);
        }
        if plan.price < Decimal::zero() {
            return Err(CreatePlanError::InvalidPrice);
        }
        let usable = match plan.terms {
            PlanTerms::Duration { duration_days } => duration_days > 0,
            PlanTerms::SessionPack { session_count } => session_count > 0,
        };
        if !usable {
            return Err(CreatePlanError::InvalidTerms);
        }
        self.store.insert(session, plan).await?;
        Ok(())
    }
}

impl Deref for Plans {
    type Target = PlanStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

#[derive(Error, Debug)]
pub enum CreatePlanError {
    #[error("Plan with this name already exists")]
    NameAlreadyExists,
    #[error("Invalid price")]
    InvalidPrice,
    #[error("Plan terms must be positive")]
    InvalidTerms,
    #[error(transparent)]
    Common(#[from] eyre::Error),
}

impl From<mongodb::error::Error> for CreatePlanError {
    fn from(err: mongodb::error::Error) -> Self {
        CreatePlanError::Common(err.into())
    }
}
