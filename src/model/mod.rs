pub mod admin;
pub mod api;
pub mod auth;
pub mod choice;
pub mod listing;
pub mod mongodb;
pub mod question;
