use actix_web::{web, HttpResponse};
use serde_json::json;

pub mod barbers;
pub mod menu;
pub mod shops;
pub mod users;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(health)));
    users::configure(cfg);
    shops::configure(cfg);
    barbers::configure(cfg);
    menu::configure(cfg);
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "Chairtime booking service is running" }))
}
