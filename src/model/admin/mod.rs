use argon2::Config as Argon2Config;
use log::info;
use mongodb::bson::doc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::mongodb::{Coll, Id};
use crate::Config;

/// An admin user, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl AdminUser {
    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// An admin user that has not been inserted yet, so has no ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAdminUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl NewAdminUser {
    /// Create an admin user, hashing the password with a random salt.
    pub fn new(name: String, email: String, password: &str) -> Self {
        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash = argon2::hash_encoded(
            password.as_bytes(),
            &salt,
            &Argon2Config::default(),
        )
        .unwrap(); // Safe because the default `Config` is valid.
        Self {
            name,
            email,
            password_hash,
        }
    }
}

/// Raw login credentials, received from a user. These are never stored,
/// since the password is in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

/// The identity block returned by login and `/admin/me`.
#[derive(Debug, Serialize)]
pub struct AdminIdentity {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&AdminUser> for AdminIdentity {
    fn from(admin: &AdminUser) -> Self {
        Self {
            id: admin.id.to_string(),
            name: admin.name.clone(),
            email: admin.email.clone(),
        }
    }
}

/// Seed the configured admin user if no user with that email exists yet.
pub async fn ensure_admin_exists(admins: &Coll<NewAdminUser>, config: &Config) -> Result<()> {
    let existing = admins
        .clone_with_type::<AdminUser>()
        .find_one(doc! { "email": config.admin_email() }, None)
        .await?;
    if existing.is_none() {
        info!("Seeding default admin user {}", config.admin_email());
        let admin = NewAdminUser::new(
            config.admin_name().to_string(),
            config.admin_email().to_string(),
            config.admin_password(),
        );
        admins.insert_one(admin, None).await?;
    }
    Ok(())
}
