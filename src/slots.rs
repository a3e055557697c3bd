//! Time slot store. The only writers of `barber_slots` are the generator
//! (new rows) and [`try_mark_booked`] (the available -> booked transition);
//! both go through this module.

use chrono::{NaiveDate, NaiveTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::ApiError;
use crate::models::{AvailableSlotRow, SlotRow, SlotStatus};

/// Slots for one shop on one date, ordered by (barber, time). Zero rows is
/// a NotFound error, matching the upstream contract: callers treat "no
/// slots for this date" as a failed lookup, not an empty list.
pub async fn list_slots_for_date(
    pool: &SqlitePool,
    shop_id: i64,
    date: NaiveDate,
) -> Result<Vec<AvailableSlotRow>, ApiError> {
    let rows = sqlx::query_as::<_, AvailableSlotRow>(
        r#"SELECT s.slot_id, s.barber_id, b.barber_name, s.slot_time, s.status
           FROM barber_slots s
           JOIN barbers b ON s.barber_id = b.barber_id
           WHERE s.shop_id = ? AND s.slot_date = ?
           ORDER BY s.barber_id, s.slot_time"#,
    )
    .bind(shop_id)
    .bind(date)
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Err(ApiError::not_found("No available slots found"));
    }
    Ok(rows)
}

/// Point lookup scoped to the supplied shop id. A slot id belonging to a
/// different shop does not resolve, which blocks cross-shop id guessing.
pub async fn get_slot_for_shop(
    conn: &mut SqliteConnection,
    slot_id: i64,
    shop_id: i64,
) -> Result<Option<SlotRow>, sqlx::Error> {
    sqlx::query_as::<_, SlotRow>(
        r#"SELECT slot_id, barber_id, shop_id, slot_date, slot_time, is_booked, status, created_at
           FROM barber_slots
           WHERE slot_id = ? AND shop_id = ?"#,
    )
    .bind(slot_id)
    .bind(shop_id)
    .fetch_optional(conn)
    .await
}

/// Conditional booked transition. The `is_booked = 0` guard makes the
/// update a no-op when a concurrent request won the slot first; the caller
/// decides success by the returned flag, never by a prior read.
pub async fn try_mark_booked(
    conn: &mut SqliteConnection,
    slot_id: i64,
    shop_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE barber_slots SET is_booked = 1, status = ? WHERE slot_id = ? AND shop_id = ? AND is_booked = 0",
    )
    .bind(SlotStatus::Booked)
    .bind(slot_id)
    .bind(shop_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn slot_exists(
    conn: &mut SqliteConnection,
    barber_id: i64,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM barber_slots WHERE barber_id = ? AND slot_date = ? AND slot_time = ?",
    )
    .bind(barber_id)
    .bind(date)
    .bind(time)
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}

pub async fn insert_slot(
    conn: &mut SqliteConnection,
    barber_id: i64,
    shop_id: i64,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO barber_slots (barber_id, shop_id, slot_date, slot_time, is_booked, status, created_at)
           VALUES (?, ?, ?, ?, 0, ?, ?)"#,
    )
    .bind(barber_id)
    .bind(shop_id)
    .bind(date)
    .bind(time)
    .bind(SlotStatus::Available)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}
