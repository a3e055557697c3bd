use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

pub const ROLE_CUSTOMER: &str = "customer";
pub const ROLE_OWNER: &str = "owner";

/// Lifecycle of a bookable slot. A slot moves available -> booked exactly
/// once; there is no cancellation path. Stored as lowercase TEXT, so any
/// unknown value in the table fails decoding instead of leaking through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Booked,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub hashed_password: Option<String>,
    pub phone_number: Option<String>,
    pub role: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShopRow {
    pub shop_id: i64,
    pub owner_id: i64,
    pub shop_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BarberRow {
    pub barber_id: i64,
    pub barber_name: String,
    pub shop_id: i64,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_available: bool,
    pub generate_daily: bool,
    pub created_at: DateTime<Utc>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SlotRow {
    pub slot_id: i64,
    pub barber_id: i64,
    pub shop_id: i64,
    pub slot_date: NaiveDate,
    pub slot_time: NaiveTime,
    pub is_booked: bool,
    pub status: SlotStatus,
    pub created_at: DateTime<Utc>,
}

/// Listing row for `GET /shops/{id}/slots`, joined with the barber name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AvailableSlotRow {
    pub slot_id: i64,
    pub barber_id: i64,
    pub barber_name: String,
    pub slot_time: NaiveTime,
    pub status: SlotStatus,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OtpRow {
    pub id: i64,
    pub email: String,
    pub otp_code: String,
    pub otp_expiry: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MenuRow {
    pub menu_id: i64,
    pub shop_id: i64,
    pub service_name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_minutes: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
