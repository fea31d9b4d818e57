use chrono::Duration;
use log::{error, info};
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    admin::ensure_admin_exists,
    mongodb::{ensure_indexes_exist, Coll},
    question::ensure_questions_seeded,
};

/// Which questions feed the three named dashboard pie charts.
#[derive(Debug, Clone, Deserialize)]
pub struct PieChartQuestions {
    pub purchase_frequency: u32,
    pub recommendation_likelihood: u32,
    pub product_category: u32,
}

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    hostname: String,
    auth_ttl: u32,
    email_question_id: u32,
    pie_chart_questions: PieChartQuestions,
    radar_chart_questions: Vec<u32>,
    admin_email: String,
    admin_name: String,
    // secrets
    jwt_secret: String,
    admin_password: String,
}

impl Config {
    /// The hostname the site is running on.
    /// Used to build absolute response URLs.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Valid lifetime of auth tokens in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// The question whose answer doubles as the respondent's email address.
    pub fn email_question_id(&self) -> u32 {
        self.email_question_id
    }

    /// The questions feeding the dashboard pie charts.
    pub fn pie_chart_questions(&self) -> &PieChartQuestions {
        &self.pie_chart_questions
    }

    /// The questions feeding the dashboard radar chart, in display order.
    pub fn radar_chart_questions(&self) -> &[u32] {
        &self.radar_chart_questions
    }

    /// The identity of the default admin user, seeded on first launch.
    pub fn admin_email(&self) -> &str {
        &self.admin_email
    }

    pub fn admin_name(&self) -> &str {
        &self.admin_name
    }

    /// Initial password for the default admin user.
    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Is the given authenticated identity the designated admin?
    ///
    /// Credential verification happens separately; this only decides whether
    /// a verified identity may use the admin endpoints.
    pub fn is_admin(&self, email: &str) -> bool {
        self.admin_email == email
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
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
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
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
    // secrets
    db_uri: String,
}

/// A fairing that connects to MongoDB, ensures the indexes, the question
/// catalog, and the default admin user exist, and places both a `Client`
/// and a `Database` into managed state.
///
/// Tests construct it with [`DatabaseFairing::for_client`] to reuse a
/// connection against an isolated database.
pub struct DatabaseFairing {
    client: Option<MongoClient>,
    db_name: Option<String>,
}

impl DatabaseFairing {
    /// Connect using the `db_uri` from the figment.
    pub fn connect() -> Self {
        Self {
            client: None,
            db_name: None,
        }
    }

    /// Use a pre-made connection and an explicit database name.
    pub fn for_client(client: MongoClient, db_name: String) -> Self {
        Self {
            client: Some(client),
            db_name: Some(db_name),
        }
    }
}

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // The admin seed needs the application config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Construct the connection.
        let client = match &self.client {
            Some(client) => client.clone(),
            None => {
                let db_config = match rocket.figment().extract::<DbConfig>() {
                    Ok(db_config) => db_config,
                    Err(e) => {
                        error!("Failed to load database config");
                        rocket::config::pretty_print_error(e);
                        return Err(rocket);
                    }
                };
                info!("Loaded database config, connecting...");
                match MongoClient::with_uri_str(db_config.db_uri).await {
                    Ok(client) => client,
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
        };
        let db_name = self
            .db_name
            .clone()
            .unwrap_or_else(|| "survey".to_string());
        let db = client.database(&db_name);

        // Ensure the required indexes exist.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to set up database indexes: {e}");
            return Err(rocket);
        }

        // Seed the question catalog and the default admin user if absent.
        if let Err(e) = ensure_questions_seeded(&Coll::from_db(&db)).await {
            error!("Failed to seed question catalog: {e}");
            return Err(rocket);
        }
        if let Err(e) = ensure_admin_exists(&Coll::from_db(&db), &config).await {
            error!("Failed to seed admin user: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state. `Config` itself is managed by `ConfigFairing`.
        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}
