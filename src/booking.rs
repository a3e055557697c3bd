//! Booking engine: converts available slots into confirmed bookings for a
//! user, all-or-nothing per request.

use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::ApiError;
use crate::models::SlotStatus;
use crate::slots;

#[derive(Debug, Serialize)]
pub struct BookedSlot {
    pub slot_id: i64,
    pub slot_date: NaiveDate,
    pub slot_time: NaiveTime,
    pub status: SlotStatus,
}

#[derive(Debug, Serialize)]
pub struct BookingManifest {
    pub message: String,
    pub user_id: i64,
    pub barber_id: i64,
    pub shop_id: i64,
    pub booked_slots: Vec<BookedSlot>,
}

/// Reserve every listed slot for the user inside one transaction. The first
/// missing or taken slot fails the whole request and rolls everything back.
///
/// Slot ids are resolved against the supplied shop id, so an id guessed
/// from another shop reads as NotFound. The booked transition itself is the
/// conditional update in [`slots::try_mark_booked`]; a zero affected-row
/// count means a concurrent request won the slot between our read and
/// write, which surfaces as AlreadyBooked just like a stale read would.
pub async fn book_slots(
    pool: &SqlitePool,
    user_id: i64,
    barber_id: i64,
    shop_id: i64,
    slot_ids: &[i64],
) -> Result<BookingManifest, ApiError> {
    let mut tx = pool.begin().await?;
    let mut booked_slots = Vec::with_capacity(slot_ids.len());

    for &slot_id in slot_ids {
        let slot = slots::get_slot_for_shop(&mut tx, slot_id, shop_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Slot {slot_id} not found")))?;

        if slot.is_booked {
            return Err(ApiError::AlreadyBooked(slot_id));
        }

        if !slots::try_mark_booked(&mut tx, slot_id, shop_id).await? {
            return Err(ApiError::AlreadyBooked(slot_id));
        }

        sqlx::query(
            r#"INSERT INTO bookings (user_id, barber_id, shop_id, slot_id, booking_date, booking_time, status, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(user_id)
        .bind(barber_id)
        .bind(shop_id)
        .bind(slot_id)
        .bind(slot.slot_date)
        .bind(slot.slot_time)
        .bind(SlotStatus::Booked)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        booked_slots.push(BookedSlot {
            slot_id,
            slot_date: slot.slot_date,
            slot_time: slot.slot_time,
            status: SlotStatus::Booked,
        });
    }

    tx.commit().await?;
    log::info!(
        "user {user_id} booked {} slot(s) with barber {barber_id} at shop {shop_id}",
        booked_slots.len()
    );

    Ok(BookingManifest {
        message: format!("{} slots booked successfully", booked_slots.len()),
        user_id,
        barber_id,
        shop_id,
        booked_slots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testutil::{
        count_bookings_for_slot, pool, seed_barber, seed_shop, seed_slot, seed_user,
    };
    use crate::models::{SlotRow, ROLE_CUSTOMER, ROLE_OWNER};
    use chrono::NaiveDate;
    use chrono::NaiveTime;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn time(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    struct Fixture {
        pool: SqlitePool,
        user: i64,
        shop: i64,
        barber: i64,
    }

    async fn fixture() -> Fixture {
        let pool = pool().await;
        let owner = seed_user(&pool, "owner", ROLE_OWNER).await;
        let user = seed_user(&pool, "customer", ROLE_CUSTOMER).await;
        let shop = seed_shop(&pool, owner, "Fade Factory", true).await;
        let barber = seed_barber(&pool, shop, "Ana", None, None, false).await;
        Fixture { pool, user, shop, barber }
    }

    async fn slot_row(pool: &SqlitePool, slot_id: i64, shop_id: i64) -> SlotRow {
        let mut conn = pool.acquire().await.unwrap();
        slots::get_slot_for_shop(&mut conn, slot_id, shop_id)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn books_listed_slots_and_returns_a_manifest() {
        let f = fixture().await;
        let day = date("2026-09-01");
        let first = seed_slot(&f.pool, f.barber, f.shop, day, time(9), false).await;
        let second = seed_slot(&f.pool, f.barber, f.shop, day, time(10), false).await;

        let manifest = book_slots(&f.pool, f.user, f.barber, f.shop, &[first, second])
            .await
            .unwrap();

        assert_eq!(manifest.message, "2 slots booked successfully");
        assert_eq!(manifest.booked_slots.len(), 2);
        assert_eq!(manifest.booked_slots[0].slot_id, first);
        assert_eq!(manifest.booked_slots[0].slot_time, time(9));
        assert_eq!(manifest.booked_slots[0].status, SlotStatus::Booked);

        let row = slot_row(&f.pool, first, f.shop).await;
        assert!(row.is_booked);
        assert_eq!(count_bookings_for_slot(&f.pool, first).await, 1);
        assert_eq!(count_bookings_for_slot(&f.pool, second).await, 1);
    }

    #[tokio::test]
    async fn unknown_slot_fails_not_found() {
        let f = fixture().await;
        let err = book_slots(&f.pool, f.user, f.barber, f.shop, &[999])
            .await
            .unwrap_err();
        match err {
            ApiError::NotFound(detail) => assert_eq!(detail, "Slot 999 not found"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slot_from_another_shop_fails_not_found() {
        let f = fixture().await;
        let owner2 = seed_user(&f.pool, "owner2", ROLE_OWNER).await;
        let other_shop = seed_shop(&f.pool, owner2, "Clip Joint", true).await;
        let other_barber = seed_barber(&f.pool, other_shop, "Bruno", None, None, false).await;
        let foreign_slot =
            seed_slot(&f.pool, other_barber, other_shop, date("2026-09-01"), time(9), false).await;

        let err = book_slots(&f.pool, f.user, f.barber, f.shop, &[foreign_slot])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        // the slot is untouched in its own shop
        let row = slot_row(&f.pool, foreign_slot, other_shop).await;
        assert!(!row.is_booked);
    }

    #[tokio::test]
    async fn already_booked_slot_fails_the_request() {
        let f = fixture().await;
        let taken = seed_slot(&f.pool, f.barber, f.shop, date("2026-09-01"), time(9), true).await;

        let err = book_slots(&f.pool, f.user, f.barber, f.shop, &[taken])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AlreadyBooked(id) if id == taken));
        assert_eq!(count_bookings_for_slot(&f.pool, taken).await, 0);
    }

    #[tokio::test]
    async fn multi_slot_booking_is_all_or_nothing() {
        let f = fixture().await;
        let day = date("2026-09-01");
        let open = seed_slot(&f.pool, f.barber, f.shop, day, time(9), false).await;
        let taken = seed_slot(&f.pool, f.barber, f.shop, day, time(10), true).await;

        let err = book_slots(&f.pool, f.user, f.barber, f.shop, &[open, taken])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AlreadyBooked(id) if id == taken));

        // the rollback left the first slot available and unreferenced
        let row = slot_row(&f.pool, open, f.shop).await;
        assert!(!row.is_booked);
        assert_eq!(row.status, SlotStatus::Available);
        assert_eq!(count_bookings_for_slot(&f.pool, open).await, 0);
    }

    #[tokio::test]
    async fn at_most_one_booking_wins_under_contention() {
        let f = fixture().await;
        let slot = seed_slot(&f.pool, f.barber, f.shop, date("2026-09-01"), time(9), false).await;
        let rival = seed_user(&f.pool, "rival", ROLE_CUSTOMER).await;

        let a = {
            let pool = f.pool.clone();
            let (user, barber, shop) = (f.user, f.barber, f.shop);
            tokio::spawn(async move { book_slots(&pool, user, barber, shop, &[slot]).await })
        };
        let b = {
            let pool = f.pool.clone();
            let (barber, shop) = (f.barber, f.shop);
            tokio::spawn(async move { book_slots(&pool, rival, barber, shop, &[slot]).await })
        };

        let outcomes = [a.await.unwrap(), b.await.unwrap()];
        let wins = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1, "exactly one request may win the slot");
        let loss = outcomes.iter().find(|r| r.is_err()).unwrap();
        assert!(matches!(
            loss.as_ref().unwrap_err(),
            ApiError::AlreadyBooked(id) if *id == slot
        ));

        assert_eq!(count_bookings_for_slot(&f.pool, slot).await, 1);
    }
}
