pub mod access_token;
pub mod auth;
pub mod categories;
pub mod products;
pub mod reaper;
pub mod refresh_token;
pub mod users;
