//! HTTP API handlers for tunehub-api

pub mod auth;
pub mod health;
pub mod tracks;

pub use auth::CurrentUser;
pub use health::health_routes;
pub use tracks::track_routes;
