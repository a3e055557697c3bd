//! Sweeps stale email verification codes. Scheduled, so failures are
//! logged and the next tick tries again.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

pub async fn delete_expired_otps(pool: &SqlitePool) {
    match sweep(pool, Utc::now()).await {
        Ok(deleted) => log::info!("[otp cleanup] deleted {deleted} expired OTP record(s)"),
        Err(err) => log::error!("[otp cleanup] sweep failed: {err}"),
    }
}

/// Deletes verification rows created more than five minutes before `now`.
pub(crate) async fn sweep(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let cutoff = now - Duration::minutes(5);
    let result = sqlx::query("DELETE FROM email_verification WHERE created_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
