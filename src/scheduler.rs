//! Background timer facility. One instance is constructed by `main`,
//! started after the pool is ready, and shut down when the server exits;
//! there is no process-wide singleton.

use std::future::Future;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::jobs;

const OTP_CLEANUP_EVERY: Duration = Duration::from_secs(5 * 60);
const SLOT_GENERATION_EVERY: Duration = Duration::from_secs(60 * 60);

pub struct Scheduler {
    shutdown: broadcast::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawns the two recurring jobs: the OTP-expiry sweep and the
    /// full-barber-set slot generation run. Each job logs its own failures;
    /// a bad run never stops the ticker.
    pub fn start(pool: SqlitePool) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        let handles = vec![
            spawn_job(
                "otp cleanup",
                OTP_CLEANUP_EVERY,
                shutdown.subscribe(),
                pool.clone(),
                |pool| async move { jobs::otp_cleanup::delete_expired_otps(&pool).await },
            ),
            spawn_job(
                "slot generator",
                SLOT_GENERATION_EVERY,
                shutdown.subscribe(),
                pool,
                |pool| async move { jobs::slot_generator::generate_barber_slots(&pool, None).await },
            ),
        ];
        log::info!("Scheduler started: OTP cleanup + slot generator running");
        Self { shutdown, handles }
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        for handle in self.handles {
            let _ = handle.await;
        }
        log::info!("Scheduler shutdown successfully");
    }
}

fn spawn_job<F, Fut>(
    name: &'static str,
    every: Duration,
    mut stop: broadcast::Receiver<()>,
    pool: SqlitePool,
    job: F,
) -> JoinHandle<()>
where
    F: Fn(SqlitePool) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut ticker = time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval yields immediately on the first tick; run once at startup
        loop {
            tokio::select! {
                _ = ticker.tick() => job(pool.clone()).await,
                _ = stop.recv() => break,
            }
        }
        log::info!("{name} job stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testutil::pool;

    #[tokio::test]
    async fn starts_and_shuts_down_cleanly() {
        let scheduler = Scheduler::start(pool().await);
        tokio::time::sleep(Duration::from_millis(50)).await;
        tokio::time::timeout(Duration::from_secs(5), scheduler.shutdown())
            .await
            .expect("shutdown must not hang");
    }
}
