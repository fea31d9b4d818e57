use chrono::{SecondsFormat, Utc};
use rocket::{serde::json::Json, Catcher, Route};
use serde::Serialize;

use crate::api::common::ApiResponse;

mod admin;
mod auth;
mod common;
mod questions;
mod responses;

pub fn routes() -> Vec<Route> {
    let mut routes = routes![health];
    routes.extend(questions::routes());
    routes.extend(responses::routes());
    routes.extend(auth::routes());
    routes.extend(admin::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![unauthorized, not_found, unprocessable, internal_error]
}

/// Liveness payload. Deliberately not wrapped in the standard envelope, as
/// monitoring probes expect a flat object.
#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    timestamp: String,
    service: &'static str,
    version: &'static str,
}

#[get("/health")]
fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        service: "Survey Platform API",
        version: "1.0.0",
    })
}

// The catchers cover failures that never reach a handler: failed request
// guards and unrouted paths. Handler errors carry their own bodies via the
// `Error` responder.

#[catch(401)]
fn unauthorized() -> Json<ApiResponse<()>> {
    ApiResponse::failure("Unauthenticated.")
}

#[catch(404)]
fn not_found() -> Json<ApiResponse<()>> {
    ApiResponse::failure("Endpoint not found. Please check the API documentation.")
}

#[catch(422)]
fn unprocessable() -> Json<ApiResponse<()>> {
    ApiResponse::failure("The request body was malformed.")
}

#[catch(500)]
fn internal_error() -> Json<ApiResponse<()>> {
    ApiResponse::failure("An internal error occurred.")
}

#[cfg(test)]
mod test_helpers {
    use rocket::{
        http::{ContentType, Header, Status},
        local::asynchronous::Client,
        serde::json::{json, Value},
    };

    use crate::model::question::{seed_catalog, QuestionType};

    /// A complete, valid answer set: the first option of every choice
    /// question, a rating of 4 on every scale question, and fixed text
    /// elsewhere. Question 1 doubles as the respondent email.
    pub fn valid_answers() -> Vec<(u32, String)> {
        seed_catalog()
            .into_iter()
            .map(|question| {
                let answer = match question.qtype {
                    QuestionType::ChoiceSingle => question.options.unwrap()[0].clone(),
                    QuestionType::ScaleFive => "4".to_string(),
                    QuestionType::FreeText if question.id == 1 => "a@b.com".to_string(),
                    QuestionType::FreeText => "No complaints so far.".to_string(),
                };
                (question.id, answer)
            })
            .collect()
    }

    /// Serialise an answer set into a submission request body.
    pub fn submission_body(answers: Vec<(u32, String)>) -> String {
        let answers: Vec<Value> = answers
            .into_iter()
            .map(|(question_id, answer)| json!({ "question_id": question_id, "answer": answer }))
            .collect();
        json!({ "answers": answers }).to_string()
    }

    /// Submit an answer set and return the minted access token.
    pub async fn submit(client: &Client, answers: Vec<(u32, String)>) -> String {
        let response = client
            .post("/responses")
            .header(ContentType::JSON)
            .body(submission_body(answers))
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let body: Value = response.into_json().await.unwrap();
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Log in as the seeded admin and return the bearer header for
    /// authenticated requests.
    pub async fn admin_auth_header(client: &Client) -> Header<'static> {
        let response = client
            .post("/admin/login")
            .header(ContentType::JSON)
            .body(r#"{"email": "admin@survey.com", "password": "admin123"}"#)
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let body: Value = response.into_json().await.unwrap();
        let token = body["data"]["token"].as_str().unwrap();
        Header::new("Authorization", format!("Bearer {token}"))
    }
}
