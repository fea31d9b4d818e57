use std::collections::BTreeMap;

use argon2::Error as Argon2Error;
use jsonwebtoken::errors::Error as JwtError;
use log::{debug, error};
use mongodb::error::Error as DbError;
use rocket::{http::Status, response::status::Custom, response::Responder, serde::json::Json};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Field-attributable validation failures, keyed the same way as the
/// request body (`email`, `answers`, `answers.{index}.answer`, ...).
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure against the given field.
    pub fn add(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(reason.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn reasons(&self, field: &str) -> Option<&Vec<String>> {
        self.0.get(field)
    }

    /// Return `value` if nothing failed, otherwise the collected failures.
    pub fn into_result<T>(self, value: T) -> std::result::Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("Validation failed")]
    Validation(ValidationErrors),
    #[error("{1}")]
    Status(Status, String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Status(Status::Unauthorized, msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Status(Status::Forbidden, msg.into())
    }
}

/// The JSON body of every error response.
#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<ValidationErrors>,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let (status, message, errors) = match self {
            // Infrastructure faults: never leak internal detail to the client.
            Self::Db(ref err) => {
                error!("Database error: {err}");
                (
                    Status::InternalServerError,
                    "Internal server error".to_string(),
                    None,
                )
            }
            Self::Jwt(ref err) => {
                error!("JWT error: {err}");
                (
                    Status::InternalServerError,
                    "Internal server error".to_string(),
                    None,
                )
            }
            Self::Argon2(ref err) => {
                error!("Password hashing error: {err}");
                (
                    Status::InternalServerError,
                    "Internal server error".to_string(),
                    None,
                )
            }
            Self::Validation(errors) => (
                Status::UnprocessableEntity,
                "Validation failed".to_string(),
                Some(errors),
            ),
            Self::Status(status, message) => {
                debug!("{status}: {message}");
                (status, message, None)
            }
            // An expected outcome (e.g. a mistyped token), not an error.
            Self::NotFound(what) => (Status::NotFound, format!("{what} not found"), None),
        };

        let body = ErrorBody {
            success: false,
            message,
            errors,
        };
        Custom(status, Json(body)).respond_to(req)
    }
}
