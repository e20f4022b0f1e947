pub mod admin;
pub mod auth;
pub mod engineer;
pub mod tickets;
