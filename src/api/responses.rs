use mongodb::bson::doc;
use mongodb::Client as MongoClient;
use rocket::{
    futures::TryStreamExt, http::Status, serde::json::Json, Route, State,
};
use serde::Serialize;

use crate::api::common::ApiResponse;
use crate::api::questions::catalog;
use crate::error::{Error, Result};
use crate::model::{
    mongodb::Coll,
    question::Question,
    response::{Answer, NewResponse, Response, ResponseResource},
    submission::{validate_submission, SubmitRequest},
};
use crate::Config;

pub fn routes() -> Vec<Route> {
    routes![submit_response, get_response]
}

/// What a successful submission hands back: the bearer credential for
/// retrieving the response later.
#[derive(Debug, Serialize)]
struct SubmissionReceipt {
    token: String,
    response_url: String,
}

#[post("/responses", data = "<request>", format = "json")]
async fn submit_response(
    request: Json<SubmitRequest>,
    config: &State<Config>,
    db_client: &State<MongoClient>,
    questions: Coll<Question>,
    new_responses: Coll<NewResponse>,
    responses: Coll<Response>,
    answers: Coll<Answer>,
) -> Result<(Status, Json<ApiResponse<SubmissionReceipt>>)> {
    let catalog = catalog(&questions).await?;
    let submission = validate_submission(&catalog, config.email_question_id(), &request)?;
    let stored = submission
        .store(db_client, &new_responses, &responses, &answers)
        .await?;

    let receipt = SubmissionReceipt {
        response_url: format!("/response/{}", stored.token),
        token: stored.token,
    };
    Ok((
        Status::Created,
        ApiResponse::ok(receipt, "Survey response submitted successfully"),
    ))
}

#[get("/responses/<token>")]
async fn get_response(
    token: &str,
    config: &State<Config>,
    questions: Coll<Question>,
    responses: Coll<Response>,
    answers: Coll<Answer>,
) -> Result<Json<ApiResponse<ResponseResource>>> {
    // Exact-match lookup; possession of the token is the authorisation.
    let response = responses
        .find_one(doc! { "token": token }, None)
        .await?
        .ok_or_else(|| Error::not_found("Survey response"))?;

    let rows: Vec<Answer> = answers
        .find(doc! { "response_id": *response.id }, None)
        .await?
        .try_collect()
        .await?;
    let catalog = catalog(&questions).await?;

    let resource = ResponseResource::assemble(response, rows, &catalog, config.hostname());
    Ok(ApiResponse::ok(resource, "Response retrieved successfully"))
}

#[cfg(test)]
mod tests {
    use rocket::{http::ContentType, local::asynchronous::Client, serde::json::Value};
    use uuid::Uuid;

    use crate::api::test_helpers::{submission_body, valid_answers};

    use super::*;

    #[backend_test]
    async fn valid_submission_returns_a_token(
        client: Client,
        responses: Coll<Response>,
        answers: Coll<Answer>,
    ) {
        let response = client
            .post(uri!(submit_response))
            .header(ContentType::JSON)
            .body(submission_body(valid_answers()))
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());

        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["success"], true);
        let token = body["data"]["token"].as_str().unwrap();
        assert!(Uuid::parse_str(token).is_ok());
        assert_eq!(
            body["data"]["response_url"],
            format!("/response/{token}")
        );

        // One response row, one answer row per question.
        assert_eq!(responses.count_documents(None, None).await.unwrap(), 1);
        assert_eq!(answers.count_documents(None, None).await.unwrap(), 20);
    }

    #[backend_test]
    async fn token_round_trip_preserves_answers(client: Client) {
        let submitted = valid_answers();
        let response = client
            .post(uri!(submit_response))
            .header(ContentType::JSON)
            .body(submission_body(submitted.clone()))
            .dispatch()
            .await;
        let body: Value = response.into_json().await.unwrap();
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let response = client.get(format!("/responses/{token}")).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let body: Value = response.into_json().await.unwrap();
        let data = &body["data"];

        // Email is derived from the answer to the email question.
        assert_eq!(data["email"], "a@b.com");
        assert_eq!(data["token"], token.as_str());

        let returned = data["answers"].as_array().unwrap();
        assert_eq!(returned.len(), submitted.len());
        for (question_id, answer_text) in &submitted {
            let found = returned
                .iter()
                .find(|answer| answer["question_id"] == *question_id)
                .unwrap();
            assert_eq!(found["answer_text"], answer_text.as_str());
            assert!(found["question"]["question_text"].is_string());
        }
    }

    #[backend_test]
    async fn short_submission_is_rejected_without_persisting(
        client: Client,
        responses: Coll<Response>,
        answers: Coll<Answer>,
    ) {
        let mut submitted = valid_answers();
        submitted.pop();

        let response = client
            .post(uri!(submit_response))
            .header(ContentType::JSON)
            .body(submission_body(submitted))
            .dispatch()
            .await;
        assert_eq!(Status::UnprocessableEntity, response.status());

        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(
            body["errors"]["answers"][0],
            "All 20 questions must be answered."
        );

        // Nothing stored.
        assert_eq!(responses.count_documents(None, None).await.unwrap(), 0);
        assert_eq!(answers.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test]
    async fn invalid_answers_are_attributed_to_their_field(
        client: Client,
        responses: Coll<Response>,
    ) {
        let mut submitted = valid_answers();
        // Question 2 is a choice question; feed it a non-option.
        submitted[1].1 = "Absolutely Thrilled".to_string();
        // Question 11 is a 1..=5 scale.
        submitted[10].1 = "0".to_string();

        let response = client
            .post(uri!(submit_response))
            .header(ContentType::JSON)
            .body(submission_body(submitted))
            .dispatch()
            .await;
        assert_eq!(Status::UnprocessableEntity, response.status());

        let body: Value = response.into_json().await.unwrap();
        assert_eq!(
            body["errors"]["answers.1.answer"][0],
            "Please select a valid option."
        );
        assert_eq!(
            body["errors"]["answers.10.answer"][0],
            "Rating must be at least 1."
        );
        assert_eq!(responses.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test]
    async fn unknown_token_is_not_found(client: Client) {
        let token = Uuid::new_v4();
        let response = client.get(format!("/responses/{token}")).dispatch().await;
        assert_eq!(Status::NotFound, response.status());

        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["success"], false);
    }
}
