pub mod api;
pub mod auth;

pub use api::*;
pub use auth::*;
