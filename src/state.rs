use sqlx::SqlitePool;

use crate::mailer::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub mailer: Mailer,
}
