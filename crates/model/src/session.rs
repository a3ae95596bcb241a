use std::ops::{Deref, DerefMut};

use bson::oid::ObjectId;
use mongodb::ClientSession;

/// Mongo client session plus the id of the trainer performing the
/// operation, so audit rows always know their actor.
pub struct Session {
    inner: ClientSession,
    actor: ObjectId,
}

impl Session {
    pub fn new(inner: ClientSession, actor: ObjectId) -> Session {
        Session { inner, actor }
    }

    /// Actor used by background jobs.
    pub fn system(inner: ClientSession) -> Session {
        Session::new(inner, ObjectId::from_bytes([0; 12]))
    }

    pub fn actor(&self) -> ObjectId {
        self.actor
    }

    pub fn set_actor(&mut self, actor: ObjectId) {
        self.actor = actor;
    }
}

impl Deref for Session {
    type Target = ClientSession;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<'a> From<&'a mut Session> for &'a mut ClientSession {
    fn from(session: &'a mut Session) -> &'a mut ClientSession {
        &mut session.inner
    }
}
