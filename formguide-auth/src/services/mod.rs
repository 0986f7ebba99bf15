pub mod auth_service;
pub mod codes;
pub mod hashing;
pub mod notification;

pub use auth_service::{AuthService, AuthSettings};
pub use hashing::SecretHasher;
pub use notification::Notifier;
