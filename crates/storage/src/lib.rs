pub mod audit;
pub mod plan;
pub mod session;
pub mod student;

use eyre::Result;
use session::Db;

const DB_NAME: &str = "coach_ledger";

#[derive(Clone)]
pub struct Storage {
    pub db: Db,
    pub students: student::StudentStore,
    pub plans: plan::PlanStore,
    pub audit: audit::AuditStore,
}

impl Storage {
    pub async fn new(uri: &str) -> Result<Self> {
        let db = Db::new(uri, DB_NAME).await?;
        let students = student::StudentStore::new(&db).await?;
        let plans = plan::PlanStore::new(&db);
        let audit = audit::AuditStore::new(&db).await?;

        Ok(Storage {
            db,
            students,
            plans,
            audit,
        })
    }
}
