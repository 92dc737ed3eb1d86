use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    admin::{AdminCredentials, NewAdmin},
    mongodb::ensure_indexes_exist,
};
use crate::store::{MongoStore, Store};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    #[serde(default = "defaults::auth_ttl")]
    auth_ttl: u32,
    #[serde(default = "defaults::latest_count")]
    latest_count: u32,
    #[serde(default = "defaults::max_choices")]
    max_choices: usize,
    admin_username: String,
    // secrets
    jwt_secret: String,
    admin_password: String,
}

mod defaults {
    pub fn auth_ttl() -> u32 {
        3600
    }

    pub fn latest_count() -> u32 {
        5
    }

    pub fn max_choices() -> usize {
        10
    }
}

impl Config {
    /// Valid lifetime of admin auth token cookies.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// How many questions the public index shows.
    pub fn latest_count(&self) -> u64 {
        self.latest_count.into()
    }

    /// The most choices a single question may own.
    pub fn max_choices(&self) -> usize {
        self.max_choices
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Credentials for the admin created when the store has none.
    pub fn bootstrap_admin(&self) -> AdminCredentials {
        AdminCredentials {
            username: self.admin_username.clone(),
            password: self.admin_password.clone(),
        }
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config: {e}");
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
    // secrets
    db_uri: Option<String>,
}

fn default_db_name() -> String {
    "polls".to_string()
}

/// A fairing that loads the database config and places a [`Store`] into
/// managed state: MongoDB if `db_uri` is set, otherwise an in-memory store.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config: {e}");
                return Err(rocket);
            }
        };

        let Some(db_uri) = config.db_uri else {
            warn!("No `db_uri` configured; polls will be kept in memory and lost on shutdown");
            rocket = rocket.manage(Store::memory());
            return Ok(rocket);
        };

        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&config.db_name);

        // Ensure the required indexes exist.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to create database indexes: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(Store::new(MongoStore::new(client, &db)));
        Ok(rocket)
    }
}

/// A fairing that ensures at least one admin exists, creating the configured
/// bootstrap admin if the store has none. Must be attached after the config
/// and store are managed.
pub struct AdminFairing;

#[rocket::async_trait]
impl Fairing for AdminFairing {
    fn info(&self) -> Info {
        Info {
            name: "Bootstrap admin",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let (credentials, store) = match (rocket.state::<Config>(), rocket.state::<Store>()) {
            (Some(config), Some(store)) => (config.bootstrap_admin(), store.clone()),
            _ => {
                error!("Config and store must be managed before the admin can be bootstrapped");
                return Err(rocket);
            }
        };

        match store.admin_count().await {
            Ok(0) => {}
            Ok(_) => return Ok(rocket),
            Err(e) => {
                error!("Failed to count admins: {e}");
                return Err(rocket);
            }
        }

        let username = credentials.username.clone();
        let admin = match NewAdmin::try_from(credentials) {
            Ok(admin) => admin,
            Err(e) => {
                error!("Illegal bootstrap admin credentials: {e:?}");
                return Err(rocket);
            }
        };
        if let Err(e) = store.insert_admin(admin).await {
            error!("Failed to create bootstrap admin: {e}");
            return Err(rocket);
        }
        info!("Created bootstrap admin {username}");
        Ok(rocket)
    }
}
