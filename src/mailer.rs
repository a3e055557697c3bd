use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::Config;
use crate::error::ApiError;

/// OTP delivery over SMTP. With no credentials configured the mailer is
/// disabled and logs the would-be delivery instead, so local setups work
/// without a relay.
#[derive(Clone)]
pub struct Mailer {
    host: String,
    email: String,
    password: String,
}

impl Mailer {
    pub fn new(config: &Config) -> Self {
        Self {
            host: config.smtp_host.clone(),
            email: config.smtp_email.clone(),
            password: config.smtp_password.clone(),
        }
    }

    pub fn enabled(&self) -> bool {
        !(self.email.trim().is_empty() || self.password.trim().is_empty())
    }

    pub async fn send_otp(&self, recipient: &str, otp: &str) -> Result<(), ApiError> {
        if !self.enabled() {
            log::warn!("SMTP credentials not set; skipping OTP delivery to {recipient}");
            return Ok(());
        }

        let message = Message::builder()
            .from(self.email.parse().map_err(|_| ApiError::OtpDelivery)?)
            .to(recipient.parse().map_err(|_| ApiError::OtpDelivery)?)
            .subject("Your OTP Verification Code")
            .header(ContentType::TEXT_PLAIN)
            .body(format!("Your OTP is {otp}. It will expire in 5 minutes."))
            .map_err(|err| {
                log::error!("failed to build OTP message for {recipient}: {err}");
                ApiError::OtpDelivery
            })?;

        let transport = SmtpTransport::starttls_relay(&self.host)
            .map_err(|err| {
                log::error!("SMTP relay setup failed: {err}");
                ApiError::OtpDelivery
            })?
            .credentials(Credentials::new(self.email.clone(), self.password.clone()))
            .build();

        let recipient = recipient.to_string();
        // lettre's blocking transport must stay off the async executor.
        let outcome = tokio::task::spawn_blocking(move || transport.send(&message)).await;
        match outcome {
            Ok(Ok(_)) => {
                log::info!("OTP sent successfully to {recipient}");
                Ok(())
            }
            Ok(Err(err)) => {
                log::error!("Failed to send OTP to {recipient}: {err}");
                Err(ApiError::OtpDelivery)
            }
            Err(err) => {
                log::error!("OTP send task failed for {recipient}: {err}");
                Err(ApiError::OtpDelivery)
            }
        }
    }
}
