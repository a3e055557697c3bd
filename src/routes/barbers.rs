use actix_web::{web, HttpResponse};
use chrono::{NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::ApiError,
    jobs,
    models::BarberRow,
    state::AppState,
};

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct BarberCreate {
    barber_name: String,
    start_time: NaiveTime,
    end_time: NaiveTime,
    #[serde(default = "default_true")]
    is_available: bool,
    /// Whether the slot agent materializes this barber's day automatically.
    #[serde(default)]
    everyday: bool,
}

#[derive(Deserialize)]
struct BarberUpdate {
    barber_name: Option<String>,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    is_available: Option<bool>,
    everyday: Option<bool>,
}

#[derive(Deserialize)]
struct OwnerQuery {
    owner_id: i64,
}

#[derive(Serialize)]
struct BarberResponse {
    barber_id: i64,
    barber_name: String,
    shop_id: i64,
    start_time: Option<String>,
    end_time: Option<String>,
    is_available: bool,
    generate_daily: bool,
}

impl From<BarberRow> for BarberResponse {
    fn from(row: BarberRow) -> Self {
        Self {
            barber_id: row.barber_id,
            barber_name: row.barber_name,
            shop_id: row.shop_id,
            start_time: row.start_time.map(|t| t.to_string()),
            end_time: row.end_time.map(|t| t.to_string()),
            is_available: row.is_available,
            generate_daily: row.generate_daily,
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/barbers")
            .service(web::resource("/add/{shop_id}").route(web::post().to(add_barber)))
            .service(web::resource("/update/{barber_id}").route(web::put().to(update_barber)))
            .service(web::resource("/delete/{barber_id}").route(web::delete().to(delete_barber)))
            .service(web::resource("/available/{shop_id}").route(web::get().to(available_barbers)))
            .service(
                web::resource("/generate-slots/{barber_id}")
                    .route(web::post().to(trigger_generation)),
            ),
    );
}

async fn add_barber(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<BarberCreate>,
) -> Result<HttpResponse, ApiError> {
    let shop_id = path.into_inner();
    let body = body.into_inner();

    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shops WHERE shop_id = ?")
        .bind(shop_id)
        .fetch_one(&state.db)
        .await?;
    if exists == 0 {
        return Err(ApiError::not_found(format!("Shop with id {shop_id} not found")));
    }

    let barber_id = sqlx::query(
        r#"INSERT INTO barbers (barber_name, shop_id, start_time, end_time, is_available, generate_daily, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&body.barber_name)
    .bind(shop_id)
    .bind(body.start_time)
    .bind(body.end_time)
    .bind(body.is_available)
    .bind(body.everyday)
    .bind(Utc::now())
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    Ok(HttpResponse::Ok().json(json!({
        "message": "Barber added successfully",
        "barber_id": barber_id,
    })))
}

async fn update_barber(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<OwnerQuery>,
    body: web::Json<BarberUpdate>,
) -> Result<HttpResponse, ApiError> {
    let barber_id = path.into_inner();
    let body = body.into_inner();

    let barber = get_barber(&state, barber_id).await?;
    authorize_owner(&state, barber.shop_id, query.owner_id, "update").await?;

    sqlx::query(
        r#"UPDATE barbers
           SET barber_name = ?, start_time = ?, end_time = ?, is_available = ?, generate_daily = ?
           WHERE barber_id = ?"#,
    )
    .bind(body.barber_name.unwrap_or(barber.barber_name))
    .bind(body.start_time.or(barber.start_time))
    .bind(body.end_time.or(barber.end_time))
    .bind(body.is_available.unwrap_or(barber.is_available))
    .bind(body.everyday.unwrap_or(barber.generate_daily))
    .bind(barber_id)
    .execute(&state.db)
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Barber updated successfully",
        "barber_id": barber_id,
    })))
}

async fn delete_barber(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<OwnerQuery>,
) -> Result<HttpResponse, ApiError> {
    let barber_id = path.into_inner();
    let barber = get_barber(&state, barber_id).await?;
    authorize_owner(&state, barber.shop_id, query.owner_id, "delete").await?;

    // cascades to the barber's slots and availability overrides
    sqlx::query("DELETE FROM barbers WHERE barber_id = ?")
        .bind(barber_id)
        .execute(&state.db)
        .await?;

    log::info!("barber {barber_id} deleted by owner {}", query.owner_id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Barber deleted successfully" })))
}

async fn available_barbers(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let shop_id = path.into_inner();
    let barbers = sqlx::query_as::<_, BarberRow>(
        "SELECT * FROM barbers WHERE shop_id = ? AND is_available = 1",
    )
    .bind(shop_id)
    .fetch_all(&state.db)
    .await?;

    if barbers.is_empty() {
        return Err(ApiError::not_found("No available barbers found"));
    }
    let barbers: Vec<BarberResponse> = barbers.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(barbers))
}

/// Single-barber generation trigger; same code path as the hourly job and
/// just as safe to repeat.
async fn trigger_generation(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let barber_id = path.into_inner();
    get_barber(&state, barber_id).await?;

    jobs::slot_generator::generate_barber_slots(&state.db, Some(barber_id)).await;
    Ok(HttpResponse::Ok().json(json!({ "message": "Slot generation triggered" })))
}

async fn get_barber(state: &web::Data<AppState>, barber_id: i64) -> Result<BarberRow, ApiError> {
    sqlx::query_as::<_, BarberRow>("SELECT * FROM barbers WHERE barber_id = ?")
        .bind(barber_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Barber not found"))
}

async fn authorize_owner(
    state: &web::Data<AppState>,
    shop_id: i64,
    owner_id: i64,
    action: &str,
) -> Result<(), ApiError> {
    // owner_id arrives as a plain request field; until sessions land, the
    // contract is a straight comparison against the shop's recorded owner
    let recorded: Option<i64> = sqlx::query_scalar("SELECT owner_id FROM shops WHERE shop_id = ?")
        .bind(shop_id)
        .fetch_optional(&state.db)
        .await?;
    match recorded {
        Some(recorded) if recorded == owner_id => Ok(()),
        Some(_) => Err(ApiError::forbidden(format!(
            "Not authorized to {action} this barber"
        ))),
        None => Err(ApiError::not_found(format!("Shop with id {shop_id} not found"))),
    }
}
