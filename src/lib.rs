#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{figment::Figment, Build, Rocket};

use crate::config::{AdminFairing, ConfigFairing, StoreFairing};
use crate::logging::LoggerFairing;
use crate::store::Store;
use crate::templates::TemplateFairing;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod store;
pub mod templates;

pub use config::Config;

/// Attach everything except the store, which must already be managed or be
/// provided by an earlier fairing.
fn assemble(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(TemplateFairing)
        .attach(AdminFairing)
        .mount("/", api::routes())
}

/// Build the server from `Rocket.toml` and `ROCKET_*` environment variables.
pub fn build() -> Rocket<Build> {
    assemble(rocket::build().attach(StoreFairing))
}

/// Build the server around an existing store.
pub fn rocket_for_store(figment: Figment, store: Store) -> Rocket<Build> {
    assemble(rocket::custom(figment).manage(store))
}

/// Configuration for a test server: debug defaults, quiet logging and a
/// known bootstrap admin.
#[cfg(test)]
pub(crate) fn test_figment() -> Figment {
    Figment::from(rocket::Config::debug_default())
        .merge(("log_level", "off"))
        .merge(("jwt_secret", "test secret, do not use in production"))
        .merge(("admin_username", "pollmaster"))
        .merge(("admin_password", "choose-wisely"))
}
