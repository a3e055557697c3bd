use actix_web::{web, HttpResponse};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth,
    error::ApiError,
    models::{OtpRow, UserRow, ROLE_CUSTOMER, ROLE_OWNER},
    state::AppState,
};

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
    phone_number: Option<String>,
    role: String,
}

#[derive(Deserialize)]
struct OtpRequest {
    email: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
    role: String,
}

#[derive(Deserialize)]
struct OtpLoginRequest {
    email: String,
    otp: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .service(web::resource("/register").route(web::post().to(register)))
            .service(web::resource("/send-verification-otp").route(web::post().to(send_otp)))
            .service(web::resource("/login").route(web::post().to(login)))
            .service(web::resource("/login-with-otp").route(web::post().to(login_with_otp))),
    );
}

async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    if body.role != ROLE_CUSTOMER && body.role != ROLE_OWNER {
        return Err(ApiError::conflict("Role must be customer or owner"));
    }
    if find_user_by_email(&state, &body.email).await?.is_some() {
        return Err(ApiError::conflict("Email already registered"));
    }
    if let Some(phone) = body.phone_number.as_deref() {
        let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE phone_number = ?")
            .bind(phone)
            .fetch_one(&state.db)
            .await?;
        if taken > 0 {
            return Err(ApiError::conflict("Phone number already registered"));
        }
    }

    let hashed = auth::hash_password(&body.password).map_err(|_| ApiError::Credential)?;
    sqlx::query(
        r#"INSERT INTO users (username, email, hashed_password, phone_number, role, is_verified, created_at)
           VALUES (?, ?, ?, ?, ?, 0, ?)"#,
    )
    .bind(&body.username)
    .bind(&body.email)
    .bind(hashed)
    .bind(&body.phone_number)
    .bind(&body.role)
    .bind(Utc::now())
    .execute(&state.db)
    .await?;

    log::info!("new user registered: {}", body.email);
    Ok(HttpResponse::Ok().json(json!({ "message": "User registered successfully" })))
}

async fn send_otp(
    state: web::Data<AppState>,
    body: web::Json<OtpRequest>,
) -> Result<HttpResponse, ApiError> {
    let email = body.into_inner().email;
    if find_user_by_email(&state, &email).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let otp = auth::generate_otp();
    let now = Utc::now();
    sqlx::query(
        r#"INSERT INTO email_verification (email, otp_code, otp_expiry, created_at)
           VALUES (?, ?, ?, ?)
           ON CONFLICT(email) DO UPDATE SET
             otp_code = excluded.otp_code,
             otp_expiry = excluded.otp_expiry,
             created_at = excluded.created_at"#,
    )
    .bind(&email)
    .bind(&otp)
    .bind(now + Duration::minutes(10))
    .bind(now)
    .execute(&state.db)
    .await?;

    state.mailer.send_otp(&email, &otp).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Verification OTP sent to your email" })))
}

async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let user = find_user_by_email(&state, &body.email)
        .await?
        .filter(|user| user.role == body.role)
        .ok_or_else(|| {
            log::warn!("invalid credentials attempt for {}", body.email);
            ApiError::Unauthorized("Invalid credentials".into())
        })?;

    let verified = user
        .hashed_password
        .as_deref()
        .is_some_and(|hash| auth::verify_password(&body.password, hash));
    if !verified {
        log::warn!("incorrect password attempt for {}", body.email);
        return Err(ApiError::Unauthorized("Invalid password".into()));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Login successful",
        "user_id": user.id,
        "role": user.role,
    })))
}

async fn login_with_otp(
    state: web::Data<AppState>,
    body: web::Json<OtpLoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let user = find_user_by_email(&state, &body.email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let record = sqlx::query_as::<_, OtpRow>(
        "SELECT id, email, otp_code, otp_expiry, created_at FROM email_verification WHERE email = ?",
    )
    .bind(&body.email)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("OTP not found"))?;

    if record.otp_code != body.otp {
        return Err(ApiError::conflict("Invalid OTP"));
    }
    if record.otp_expiry < Utc::now() {
        return Err(ApiError::conflict("OTP expired"));
    }

    sqlx::query("UPDATE users SET is_verified = 1 WHERE id = ?")
        .bind(user.id)
        .execute(&state.db)
        .await?;

    log::info!("user logged in via OTP: {}", body.email);
    Ok(HttpResponse::Ok().json(json!({
        "message": "Login successful using OTP",
        "user_id": user.id,
        "role": user.role,
    })))
}

async fn find_user_by_email(
    state: &web::Data<AppState>,
    email: &str,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        r#"SELECT id, username, email, hashed_password, phone_number, role, is_verified, created_at
           FROM users WHERE email = ?"#,
    )
    .bind(email)
    .fetch_optional(&state.db)
    .await
}
