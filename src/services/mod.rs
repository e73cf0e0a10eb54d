pub mod api;
pub mod auth;
pub mod cache;
pub mod history;
pub mod images;
pub mod profiles;
pub mod tryon;
