use std::sync::Arc;

use bson::{doc, oid::ObjectId};
use eyre::Error;
use log::info;
use model::{decimal::Decimal, plan::Plan, session::Session};
use mongodb::Collection;

use crate::session::Db;

const COLLECTION: &str = "plans";

#[derive(Clone)]
pub struct PlanStore {
    collection: Arc<Collection<Plan>>,
}

impl PlanStore {
    pub(crate) fn new(db: &Db) -> Self {
        PlanStore {
            collection: Arc::new(db.collection(COLLECTION)),
        }
    }

    pub async fn insert(&self, session: &mut Session, plan: Plan) -> Result<(), Error> {
        info!("Inserting plan: {:?}", plan);
        self.collection
            .insert_one(plan)
            .session(&mut *session)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, session: &mut Session, id: ObjectId) -> Result<(), Error> {
        info!("Deleting plan: {}", id);
        self.collection
            .delete_one(doc! { "_id": id })
            .session(&mut *session)
            .await?;
        Ok(())
    }

    pub async fn get(&self, session: &mut Session, id: ObjectId) -> Result<Option<Plan>, Error> {
        Ok(self
            .collection
            .find_one(doc! { "_id": id })
            .session(&mut *session)
            .await?)
    }

    pub async fn get_by_name(
        &self,
        session: &mut Session,
        name: &str,
    ) -> Result<Option<Plan>, Error> {
        Ok(self
            .collection
            .find_one(doc! { "name": name })
            .session(&mut *session)
            .await?)
    }

    pub async fn edit_price(
        &self,
        session: &mut Session,
        id: ObjectId,
        price: Decimal,
    ) -> Result<(), Error> {
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": { "price": price.inner() },
                    "$inc": { "version": 1 }
                },
            )
            .session(session)
            .await?;
        Ok(())
    }

    pub async fn edit_name(
        &self,
        session: &mut Session,
        id: ObjectId,
        name: String,
    ) -> Result<(), Error> {
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": { "name": name },
                    "$inc": { "version": 1 }
                },
            )
            .session(session)
            .await?;
        Ok(())
    }

    pub async fn dump(&self, session: &mut Session) -> Result<Vec<Plan>, Error> {
        let mut cursor = self.collection.find(doc! {}).session(&mut *session).await?;
        let mut plans = Vec::new();
        while let Some(plan) = cursor.next(&mut *session).await {
            plans.push(plan?);
        }
        Ok(plans)
    }
}
