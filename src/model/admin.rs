use argon2::Config as Argon2Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// An admin that has not yet been inserted into the database.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAdmin {
    pub username: String,
    pub password_hash: String,
}

/// An admin user from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: Id,
    pub username: String,
    pub password_hash: String,
}

impl Admin {
    pub fn from_new(id: Id, admin: NewAdmin) -> Self {
        Self {
            id,
            username: admin.username,
            password_hash: admin.password_hash,
        }
    }

    /// Check whether the given password is correct.
    ///
    /// A malformed stored hash never verifies.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// Raw admin credentials, received from a user. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

/// Why a set of [`AdminCredentials`] could not become an admin.
#[derive(Debug, PartialEq, Eq)]
pub enum CredentialsError {
    EmptyUsername,
    ShortPassword,
    Hashing,
}

impl TryFrom<AdminCredentials> for NewAdmin {
    type Error = CredentialsError;

    /// Convert [`AdminCredentials`] to a [`NewAdmin`] by hashing the password.
    /// This enforces that the username is non-empty, and the password meets minimum length.
    fn try_from(cred: AdminCredentials) -> Result<Self, Self::Error> {
        if cred.username.is_empty() {
            return Err(CredentialsError::EmptyUsername);
        }
        if cred.password.len() < MIN_PASSWORD_LENGTH {
            return Err(CredentialsError::ShortPassword);
        }

        // 16 bytes is the recommended salt length for argon2.
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(cred.password.as_bytes(), &salt, &Argon2Config::default())
                .map_err(|_| CredentialsError::Hashing)?;
        Ok(Self {
            username: cred.username,
            password_hash,
        })
    }
}

/// Example data for tests.
#[cfg(test)]
pub(crate) mod examples {
    use super::*;

    impl AdminCredentials {
        /// Matches the bootstrap admin configured by `test_figment`.
        pub fn example() -> Self {
            Self {
                username: "pollmaster".into(),
                password: "choose-wisely".into(),
            }
        }

        pub fn wrong_password() -> Self {
            Self {
                username: "pollmaster".into(),
                password: "choose-poorly".into(),
            }
        }
    }
}
