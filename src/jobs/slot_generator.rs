//! Materializes today's bookable slots from each barber's working window.
//! Runs unattended on the scheduler, so the public entry never returns an
//! error; a failed run rolls back whole and waits for the next tick.

use chrono::{Duration, Local, NaiveDateTime};
use sqlx::SqlitePool;

use crate::models::BarberRow;
use crate::slots;

pub async fn generate_barber_slots(pool: &SqlitePool, single_barber_id: Option<i64>) {
    let now = Local::now().naive_local();
    match generate_at(pool, single_barber_id, now).await {
        Ok(created) => {
            log::info!("[slot agent] generation completed, {created} slot(s) created")
        }
        Err(err) => log::error!("[slot agent] generation failed, run rolled back: {err}"),
    }
}

/// One generation run against an injected clock. Walks fixed 1-hour
/// intervals from start_time; an interval qualifies only while
/// `start + 1h <= end_time`, so a trailing partial hour is dropped (accepted
/// boundary rule, not a bug), and an interval whose end has already elapsed
/// is never generated retroactively.
pub(crate) async fn generate_at(
    pool: &SqlitePool,
    single_barber_id: Option<i64>,
    now: NaiveDateTime,
) -> Result<u64, sqlx::Error> {
    let today = now.date();
    let slot_duration = Duration::hours(1);

    let mut tx = pool.begin().await?;

    let base = "SELECT barber_id, barber_name, shop_id, start_time, end_time, is_available, generate_daily, created_at
                FROM barbers WHERE generate_daily = 1 AND is_available = 1";
    let barbers: Vec<BarberRow> = match single_barber_id {
        Some(id) => {
            sqlx::query_as(&format!("{base} AND barber_id = ?"))
                .bind(id)
                .fetch_all(&mut *tx)
                .await?
        }
        None => sqlx::query_as(base).fetch_all(&mut *tx).await?,
    };

    if barbers.is_empty() {
        log::info!("[slot agent] no barbers eligible for slot generation");
        return Ok(0);
    }

    let mut created = 0u64;
    for barber in barbers {
        let shop_open: Option<bool> =
            sqlx::query_scalar("SELECT is_open FROM shops WHERE shop_id = ?")
                .bind(barber.shop_id)
                .fetch_optional(&mut *tx)
                .await?;
        if shop_open != Some(true) {
            log::info!(
                "[slot agent] shop closed or missing, skipping {}",
                barber.barber_name
            );
            continue;
        }

        let (Some(start_time), Some(end_time)) = (barber.start_time, barber.end_time) else {
            log::warn!(
                "[slot agent] barber {} missing start/end time, skipping",
                barber.barber_name
            );
            continue;
        };

        let end = today.and_time(end_time);
        let mut cursor = today.and_time(start_time);

        while cursor + slot_duration <= end {
            if cursor + slot_duration <= now {
                cursor += slot_duration;
                continue;
            }

            let slot_time = cursor.time();
            if !slots::slot_exists(&mut tx, barber.barber_id, today, slot_time).await? {
                slots::insert_slot(&mut tx, barber.barber_id, barber.shop_id, today, slot_time)
                    .await?;
                log::info!(
                    "[slot agent] created slot for {} at {slot_time}",
                    barber.barber_name
                );
                created += 1;
            }

            cursor += slot_duration;
        }
    }

    tx.commit().await?;
    Ok(created)
}
