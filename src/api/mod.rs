pub mod achievements;
pub mod auth;
pub mod error_handler;
pub mod scores;
