pub mod health;
pub mod login;
pub mod me;
pub mod otp;
pub mod register;
pub mod resend_verification;
pub mod reset_password;
pub mod verify_email;
