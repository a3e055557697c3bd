use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;

use crate::{error::ApiError, models::MenuRow, state::AppState};

#[derive(Deserialize)]
struct MenuCreate {
    owner_id: i64,
    shop_id: i64,
    service_name: String,
    description: Option<String>,
    price: f64,
    duration_minutes: i64,
}

#[derive(Deserialize)]
struct MenuUpdate {
    owner_id: i64,
    service_name: Option<String>,
    description: Option<String>,
    price: Option<f64>,
    duration_minutes: Option<i64>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/menu")
            .service(web::resource("/add").route(web::post().to(add_menu_item)))
            .service(web::resource("/shop/{shop_id}").route(web::get().to(shop_menu)))
            .service(web::resource("/update/{menu_id}").route(web::put().to(update_menu_item))),
    );
}

async fn add_menu_item(
    state: web::Data<AppState>,
    body: web::Json<MenuCreate>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    authorize_shop_owner(
        &state,
        body.owner_id,
        body.shop_id,
        "You are not authorized to add menu items to this shop",
    )
    .await?;

    // identical service: refresh the description and reactivate instead of
    // inserting a duplicate row
    let existing = sqlx::query_as::<_, MenuRow>(
        r#"SELECT * FROM menus
           WHERE shop_id = ? AND service_name = ? AND price = ? AND duration_minutes = ?"#,
    )
    .bind(body.shop_id)
    .bind(&body.service_name)
    .bind(body.price)
    .bind(body.duration_minutes)
    .fetch_optional(&state.db)
    .await?;

    let menu_id = match existing {
        Some(menu) => {
            sqlx::query("UPDATE menus SET description = ?, is_active = 1 WHERE menu_id = ?")
                .bind(body.description.as_deref().or(menu.description.as_deref()))
                .bind(menu.menu_id)
                .execute(&state.db)
                .await?;
            menu.menu_id
        }
        None => sqlx::query(
            r#"INSERT INTO menus (shop_id, service_name, description, price, duration_minutes, is_active, created_at)
               VALUES (?, ?, ?, ?, ?, 1, ?)"#,
        )
        .bind(body.shop_id)
        .bind(&body.service_name)
        .bind(&body.description)
        .bind(body.price)
        .bind(body.duration_minutes)
        .bind(Utc::now())
        .execute(&state.db)
        .await?
        .last_insert_rowid(),
    };

    let menu = get_menu(&state, menu_id).await?;
    Ok(HttpResponse::Ok().json(menu))
}

async fn shop_menu(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let shop_id = path.into_inner();
    let items = sqlx::query_as::<_, MenuRow>("SELECT * FROM menus WHERE shop_id = ?")
        .bind(shop_id)
        .fetch_all(&state.db)
        .await?;
    Ok(HttpResponse::Ok().json(items))
}

async fn update_menu_item(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<MenuUpdate>,
) -> Result<HttpResponse, ApiError> {
    let menu_id = path.into_inner();
    let body = body.into_inner();

    let menu = get_menu(&state, menu_id).await?;
    authorize_shop_owner(
        &state,
        body.owner_id,
        menu.shop_id,
        "You are not authorized to update this menu",
    )
    .await?;

    sqlx::query(
        r#"UPDATE menus
           SET service_name = ?, description = ?, price = ?, duration_minutes = ?
           WHERE menu_id = ?"#,
    )
    .bind(body.service_name.unwrap_or(menu.service_name))
    .bind(body.description.or(menu.description))
    .bind(body.price.unwrap_or(menu.price))
    .bind(body.duration_minutes.unwrap_or(menu.duration_minutes))
    .bind(menu_id)
    .execute(&state.db)
    .await?;

    let updated = get_menu(&state, menu_id).await?;
    Ok(HttpResponse::Ok().json(updated))
}

async fn get_menu(state: &web::Data<AppState>, menu_id: i64) -> Result<MenuRow, ApiError> {
    sqlx::query_as::<_, MenuRow>("SELECT * FROM menus WHERE menu_id = ?")
        .bind(menu_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Menu item not found"))
}

async fn authorize_shop_owner(
    state: &web::Data<AppState>,
    owner_id: i64,
    shop_id: i64,
    detail: &str,
) -> Result<(), ApiError> {
    let owns: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM shops WHERE shop_id = ? AND owner_id = ?")
            .bind(shop_id)
            .bind(owner_id)
            .fetch_one(&state.db)
            .await?;
    if owns == 0 {
        return Err(ApiError::forbidden(detail));
    }
    Ok(())
}
