//! Shapes of data exchanged with clients, as opposed to stored in the database.

pub mod admin;
pub mod pagination;
pub mod question;
