use rocket::Route;

use crate::model::mongodb::Id;

mod admin;
mod auth;
mod polls;

/// An ID taken from a request path. Malformed IDs are kept as errors so that
/// routes can report them as missing rather than unprocessable.
type PathId = Result<Id, mongodb::bson::oid::Error>;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(auth::routes());
    routes.extend(polls::routes());
    routes
}
