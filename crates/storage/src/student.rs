use std::sync::Arc;

use bson::to_document;
use eyre::{Error, Result};
use futures_util::stream::TryStreamExt;
use log::info;
use model::{session::Session, student::Student};
use mongodb::{
    bson::{doc, oid::ObjectId},
    Collection, IndexModel,
};

use crate::session::Db;

const COLLECTION: &str = "students";

#[derive(Clone)]
pub struct StudentStore {
    students: Arc<Collection<Student>>,
}

impl StudentStore {
    pub(crate) async fn new(db: &Db) -> Result<Self> {
        let students: Collection<Student> = db.collection(COLLECTION);
        students
            .create_index(IndexModel::builder().keys(doc! { "email": 1 }).build())
            .await?;
        Ok(StudentStore {
            students: Arc::new(students),
        })
    }

    pub async fn get_by_id(&self, session: &mut Session, id: ObjectId) -> Result<Option<Student>> {
        Ok(self
            .students
            .find_one(doc! { "_id": id })
            .session(&mut *session)
            .await?)
    }

    pub async fn get_by_email(
        &self,
        session: &mut Session,
        email: &str,
    ) -> Result<Option<Student>> {
        Ok(self
            .students
            .find_one(doc! { "email": email })
            .session(&mut *session)
            .await?)
    }

    pub async fn insert(&self, session: &mut Session, student: Student) -> Result<()> {
        info!("Inserting student: {:?}", student);
        self.students
            .insert_one(student)
            .session(&mut *session)
            .await?;
        Ok(())
    }

    /// Full-document write-back of a mutated aggregate. Callers read and
    /// mutate inside a transaction; the version bump happens here so no
    /// write skips it.
    pub async fn update(&self, session: &mut Session, mut student: Student) -> Result<()> {
        student.version += 1;
        let updated = self
            .students
            .update_one(
                doc! { "_id": student.id },
                doc! { "$set": to_document(&student)? },
            )
            .session(&mut *session)
            .await?;
        if updated.matched_count != 1 {
            return Err(Error::msg("Student not found"));
        }
        Ok(())
    }

    pub async fn find_all(&self, session: &mut Session) -> Result<Vec<Student>> {
        let mut cursor = self
            .students
            .find(doc! {})
            .session(&mut *session)
            .await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    /// Roster slice the reminder sweep cares about.
    pub async fn find_with_plan(&self, session: &mut Session) -> Result<Vec<Student>> {
        let filter = doc! { "plan_id": { "$ne": null } };
        let mut cursor = self.students.find(filter).session(&mut *session).await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }
}
