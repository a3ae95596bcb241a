use std::sync::Arc;

use bson::doc;
use eyre::Error;
use model::{audit::AuditRow, session::Session};
use mongodb::{Collection, IndexModel};

use crate::session::Db;

const COLLECTION: &str = "audit";

#[derive(Clone)]
pub struct AuditStore {
    collection: Arc<Collection<AuditRow>>,
}

impl AuditStore {
    pub(crate) async fn new(db: &Db) -> Result<Self, Error> {
        let collection: Collection<AuditRow> = db.collection(COLLECTION);
        collection
            .create_index(IndexModel::builder().keys(doc! { "date_time": -1 }).build())
            .await?;
        Ok(AuditStore {
            collection: Arc::new(collection),
        })
    }

    pub async fn insert(&self, session: &mut Session, row: AuditRow) -> Result<(), Error> {
        self.collection
            .insert_one(row)
            .session(&mut *session)
            .await?;
        Ok(())
    }

    pub async fn get_logs(
        &self,
        session: &mut Session,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<AuditRow>, Error> {
        let mut cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "date_time": -1 })
            .skip(offset as u64)
            .session(&mut *session)
            .await?;
        let mut rows = Vec::with_capacity(limit);
        while let Some(row) = cursor.next(&mut *session).await {
            rows.push(row?);
            if rows.len() >= limit {
                break;
            }
        }
        Ok(rows)
    }
}
