use std::ops::Deref;

use eyre::Error;
use model::{errors::LedgerError, session::Session, student::Student};
use mongodb::bson::oid::ObjectId;
use storage::student::StudentStore;

#[derive(Clone)]
pub struct Students {
    pub store: StudentStore,
}

impl Students {
    pub fn new(store: StudentStore) -> Self {
        Students { store }
    }

    pub async fn get(&self, session: &mut Session, id: ObjectId) -> Result<Student, LedgerError> {
        self.store
            .get_by_id(session, id)
            .await?
            .ok_or(LedgerError::StudentNotFound(id))
    }

    pub async fn find_all(&self, session: &mut Session) -> Result<Vec<Student>, Error> {
        self.store.find_all(session).await
    }
}

impl Deref for Students {
    type Target = StudentStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}
