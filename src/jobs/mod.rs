pub mod otp_cleanup;
pub mod slot_generator;
