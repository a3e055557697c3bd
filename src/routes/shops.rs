use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    booking,
    error::ApiError,
    models::{ShopRow, UserRow, ROLE_OWNER},
    slots,
    state::AppState,
};

#[derive(Deserialize)]
struct ShopCreate {
    shop_name: String,
    address: String,
    city: String,
    state: String,
    open_time: NaiveTime,
    close_time: NaiveTime,
}

#[derive(Deserialize)]
struct OwnerQuery {
    owner_id: i64,
}

#[derive(Deserialize)]
struct SlotsQuery {
    date: NaiveDate,
}

#[derive(Deserialize)]
struct BookingRequest {
    user_id: i64,
    barber_id: i64,
    shop_id: i64,
    slot_ids: Vec<i64>,
}

#[derive(Serialize)]
struct ShopResponse {
    shop_id: i64,
    shop_name: String,
    address: String,
    city: String,
    state: String,
    open_time: String,
    close_time: String,
    is_open: bool,
}

impl From<ShopRow> for ShopResponse {
    fn from(row: ShopRow) -> Self {
        Self {
            shop_id: row.shop_id,
            shop_name: row.shop_name,
            address: row.address,
            city: row.city,
            state: row.state,
            open_time: row.open_time.to_string(),
            close_time: row.close_time.to_string(),
            is_open: row.is_open,
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/shops").route(web::get().to(list_shops)))
        .service(web::resource("/shops/{shop_id}/slots").route(web::get().to(list_slots)))
        .service(web::resource("/owner/{owner_id}").route(web::get().to(shops_by_owner)))
        .service(web::resource("/create").route(web::post().to(create_shop)))
        .service(web::resource("/book-slots").route(web::post().to(book_slots)));
}

async fn list_shops(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let shops = sqlx::query_as::<_, ShopRow>("SELECT * FROM shops")
        .fetch_all(&state.db)
        .await?;
    if shops.is_empty() {
        return Err(ApiError::not_found("No shops found"));
    }
    let shops: Vec<ShopResponse> = shops.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(shops))
}

async fn shops_by_owner(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let owner_id = path.into_inner();
    let shops = sqlx::query_as::<_, ShopRow>("SELECT * FROM shops WHERE owner_id = ?")
        .bind(owner_id)
        .fetch_all(&state.db)
        .await?;
    if shops.is_empty() {
        return Err(ApiError::not_found("No shops found for owner"));
    }
    let shops: Vec<ShopResponse> = shops.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(shops))
}

async fn list_slots(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<SlotsQuery>,
) -> Result<HttpResponse, ApiError> {
    let shop_id = path.into_inner();
    let rows = slots::list_slots_for_date(&state.db, shop_id, query.date).await?;
    Ok(HttpResponse::Ok().json(rows))
}

async fn create_shop(
    state: web::Data<AppState>,
    query: web::Query<OwnerQuery>,
    body: web::Json<ShopCreate>,
) -> Result<HttpResponse, ApiError> {
    let owner_id = query.owner_id;
    let body = body.into_inner();

    let owner = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
        .bind(owner_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Owner not found"))?;
    if owner.role != ROLE_OWNER {
        return Err(ApiError::forbidden("User not authorized to create shop"));
    }

    let duplicate: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM shops WHERE owner_id = ? AND shop_name = ?")
            .bind(owner_id)
            .bind(&body.shop_name)
            .fetch_one(&state.db)
            .await?;
    if duplicate > 0 {
        return Err(ApiError::conflict("Shop already exists for this owner"));
    }

    let shop_id = sqlx::query(
        r#"INSERT INTO shops (owner_id, shop_name, address, city, state, open_time, close_time, is_open, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?)"#,
    )
    .bind(owner_id)
    .bind(&body.shop_name)
    .bind(&body.address)
    .bind(&body.city)
    .bind(&body.state)
    .bind(body.open_time)
    .bind(body.close_time)
    .bind(Utc::now())
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    log::info!("shop {} created for owner {owner_id}", body.shop_name);
    Ok(HttpResponse::Ok().json(json!({
        "message": "Shop created successfully",
        "shop_id": shop_id,
    })))
}

async fn book_slots(
    state: web::Data<AppState>,
    body: web::Json<BookingRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let manifest = booking::book_slots(
        &state.db,
        body.user_id,
        body.barber_id,
        body.shop_id,
        &body.slot_ids,
    )
    .await?;
    Ok(HttpResponse::Ok().json(manifest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::testutil::{pool, seed_barber, seed_shop, seed_slot, seed_user};
    use crate::mailer::Mailer;
    use crate::models::ROLE_CUSTOMER;
    use actix_web::{test, App};

    async fn app_state() -> AppState {
        let config = Config {
            database_url: "sqlite::memory:".into(),
            port: 0,
            smtp_host: "smtp.example.com".into(),
            smtp_email: String::new(),
            smtp_password: String::new(),
        };
        AppState { db: pool().await, mailer: Mailer::new(&config) }
    }

    #[actix_web::test]
    async fn empty_shop_listing_is_a_404() {
        let state = app_state().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/shops").to_request()).await;
        assert_eq!(resp.status(), 404);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], "No shops found");
    }

    #[actix_web::test]
    async fn slot_listing_requires_rows_for_the_date() {
        let state = app_state().await;
        let db = state.db.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let owner = seed_user(&db, "owner", ROLE_OWNER).await;
        let shop = seed_shop(&db, owner, "Fade Factory", true).await;
        let barber = seed_barber(&db, shop, "Ana", None, None, false).await;
        seed_slot(
            &db,
            barber,
            shop,
            "2026-09-01".parse().unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            false,
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/shops/{shop}/slots?date=2026-09-01"))
                .to_request(),
        )
        .await;
        assert!(resp.status().is_success());
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body[0]["barber_name"], "Ana");
        assert_eq!(body[0]["status"], "available");

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/shops/{shop}/slots?date=2026-09-02"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn booking_round_trip_via_the_api() {
        let state = app_state().await;
        let db = state.db.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let owner = seed_user(&db, "owner", ROLE_OWNER).await;
        let customer = seed_user(&db, "customer", ROLE_CUSTOMER).await;
        let shop = seed_shop(&db, owner, "Fade Factory", true).await;
        let barber = seed_barber(&db, shop, "Ana", None, None, false).await;
        let slot = seed_slot(
            &db,
            barber,
            shop,
            "2026-09-01".parse().unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            false,
        )
        .await;

        let payload = json!({
            "user_id": customer,
            "barber_id": barber,
            "shop_id": shop,
            "slot_ids": [slot],
        });

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/book-slots")
                .set_json(&payload)
                .to_request(),
        )
        .await;
        assert!(resp.status().is_success());
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "1 slots booked successfully");
        assert_eq!(body["booked_slots"][0]["status"], "booked");

        // a second attempt on the same slot is rejected
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/book-slots")
                .set_json(&payload)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], format!("Slot {slot} already booked"));
    }

    #[actix_web::test]
    async fn shop_creation_checks_role_and_duplicates() {
        let state = app_state().await;
        let db = state.db.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let customer = seed_user(&db, "notowner", ROLE_CUSTOMER).await;
        let owner = seed_user(&db, "owner", ROLE_OWNER).await;

        let payload = json!({
            "shop_name": "Fade Factory",
            "address": "12 Main St",
            "city": "Springfield",
            "state": "IL",
            "open_time": "09:00:00",
            "close_time": "18:00:00",
        });

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/create?owner_id={customer}"))
                .set_json(&payload)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), 403);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/create?owner_id={owner}"))
                .set_json(&payload)
                .to_request(),
        )
        .await;
        assert!(resp.status().is_success());

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/create?owner_id={owner}"))
                .set_json(&payload)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), 400);
    }
}
