use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};
use serde::Serialize;

use crate::api::common::ApiResponse;
use crate::api::questions::catalog;
use crate::error::{Error, Result};
use crate::model::{
    auth::AuthToken,
    dashboard::{self, Dashboard},
    mongodb::{question_id_filter, Coll},
    pagination::Pagination,
    question::{Question, QuestionType, QuestionUpdate},
    response::{AdminResponseRow, Answer, Response},
};
use crate::Config;

pub fn routes() -> Vec<Route> {
    routes![
        get_dashboard,
        get_questionnaire,
        update_question,
        list_responses
    ]
}

#[get("/admin/dashboard")]
async fn get_dashboard(
    _token: AuthToken,
    config: &State<Config>,
    questions: Coll<Question>,
    responses: Coll<Response>,
    answers: Coll<Answer>,
) -> Result<Json<ApiResponse<Dashboard>>> {
    let dashboard = dashboard::snapshot(config, &questions, &responses, &answers).await?;
    Ok(ApiResponse::ok(
        dashboard,
        "Dashboard data retrieved successfully",
    ))
}

/// One row of the questionnaire management table.
#[derive(Debug, Serialize)]
struct QuestionnaireEntry {
    id: u32,
    number: usize,
    question_text: String,
    #[serde(rename = "type")]
    qtype: QuestionType,
    type_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<Vec<String>>,
    response_count: u64,
}

#[get("/admin/questionnaire")]
async fn get_questionnaire(
    _token: AuthToken,
    questions: Coll<Question>,
    answers: Coll<Answer>,
) -> Result<Json<ApiResponse<Vec<QuestionnaireEntry>>>> {
    let catalog = catalog(&questions).await?;

    let mut entries = Vec::with_capacity(catalog.len());
    for (index, question) in catalog.into_iter().enumerate() {
        let response_count = answers
            .count_documents(doc! { "question_id": question.id }, None)
            .await?;
        entries.push(QuestionnaireEntry {
            id: question.id,
            number: index + 1,
            qtype: question.qtype,
            type_label: question.qtype.label(),
            question_text: question.question_text,
            options: question.options,
            response_count,
        });
    }

    Ok(ApiResponse::ok(
        entries,
        "Questionnaire retrieved successfully",
    ))
}

#[put("/admin/questions/<question_id>", data = "<update>", format = "json")]
async fn update_question(
    question_id: u32,
    update: Json<QuestionUpdate>,
    _token: AuthToken,
    questions: Coll<Question>,
) -> Result<Json<ApiResponse<Question>>> {
    let mut question = questions
        .find_one(question_id_filter(question_id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Question {question_id}")))?;

    let update = update.into_inner().validate()?;
    question.apply_update(update);
    questions
        .replace_one(question_id_filter(question_id), &question, None)
        .await?;

    Ok(ApiResponse::ok(question, "Question updated successfully"))
}

/// Case-insensitive substring filter over email and token, with regex
/// metacharacters in the search term neutralised.
fn search_filter(search: &str) -> Document {
    let mut escaped = String::with_capacity(search.len());
    for c in search.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    doc! {
        "$or": [
            { "email": { "$regex": &escaped, "$options": "i" } },
            { "token": { "$regex": &escaped, "$options": "i" } },
        ]
    }
}

#[get("/admin/responses?<search>")]
async fn list_responses(
    search: Option<&str>,
    pagination: Pagination,
    _token: AuthToken,
    questions: Coll<Question>,
    responses: Coll<Response>,
    answers: Coll<Answer>,
) -> Result<Json<ApiResponse<Vec<AdminResponseRow>>>> {
    let filter = search
        .filter(|term| !term.is_empty())
        .map(search_filter)
        .unwrap_or_default();

    let total = responses.count_documents(filter.clone(), None).await?;
    let options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .skip(pagination.skip())
        .limit(pagination.limit())
        .build();
    let page: Vec<Response> = responses.find(filter, options).await?.try_collect().await?;

    let catalog = catalog(&questions).await?;
    let mut rows = Vec::with_capacity(page.len());
    for response in page {
        let response_answers: Vec<Answer> = answers
            .find(doc! { "response_id": *response.id }, None)
            .await?
            .try_collect()
            .await?;
        rows.push(AdminResponseRow::assemble(
            response,
            response_answers,
            &catalog,
        ));
    }

    Ok(ApiResponse::page(
        rows,
        pagination.meta(total),
        "Responses retrieved successfully",
    ))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::Value,
    };

    use crate::api::test_helpers::{admin_auth_header, submit, valid_answers};

    use super::*;

    #[backend_test]
    async fn dashboard_starts_empty(client: Client) {
        let auth = admin_auth_header(&client).await;
        let response = client
            .get(uri!(get_dashboard))
            .header(auth)
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let body: Value = response.into_json().await.unwrap();
        let data = &body["data"];
        assert_eq!(data["total_responses"], 0);
        assert_eq!(data["statistics"]["today"], 0);
        assert_eq!(data["recent_responses"].as_array().unwrap().len(), 0);

        // A week of zeroes, oldest day first.
        let trend = data["response_trends"].as_array().unwrap();
        assert_eq!(trend.len(), 7);
        assert!(trend.iter().all(|point| point["count"] == 0));

        // Catalog options appear even with no votes.
        let pie = &data["pie_charts"]["purchase_frequency"];
        assert_eq!(pie["labels"].as_array().unwrap().len(), 5);
        assert!(pie["data"]
            .as_array()
            .unwrap()
            .iter()
            .all(|count| *count == 0));
        assert_eq!(pie["total"], 0);
    }

    #[backend_test]
    async fn dashboard_reflects_a_submission(client: Client) {
        submit(&client, valid_answers()).await;

        let auth = admin_auth_header(&client).await;
        let response = client
            .get(uri!(get_dashboard))
            .header(auth)
            .dispatch()
            .await;
        let body: Value = response.into_json().await.unwrap();
        let data = &body["data"];

        assert_eq!(data["total_responses"], 1);
        assert_eq!(data["statistics"]["today"], 1);
        assert_eq!(data["statistics"]["this_week"], 1);
        assert_eq!(data["statistics"]["this_month"], 1);
        assert_eq!(data["response_trends"].as_array().unwrap()[6]["count"], 1);
        assert_eq!(data["recent_responses"][0]["email"], "a@b.com");

        // The submission helper picks the first option of every choice
        // question, so the pie concentrates on one slice.
        let pie = &data["pie_charts"]["purchase_frequency"];
        assert_eq!(pie["total"], 1);
        assert_eq!(pie["data"][0], 1);

        // And rates every scale question 4.
        let radar = &data["radar_chart"];
        assert_eq!(radar["labels"].as_array().unwrap().len(), 5);
        let averages = radar["datasets"][0]["data"].as_array().unwrap();
        assert!(averages.iter().all(|average| *average == 4.0));
        assert_eq!(radar["datasets"][0]["borderWidth"], 2);
    }

    #[backend_test]
    async fn questionnaire_lists_all_questions_with_counts(client: Client) {
        submit(&client, valid_answers()).await;

        let auth = admin_auth_header(&client).await;
        let response = client
            .get(uri!(get_questionnaire))
            .header(auth)
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let body: Value = response.into_json().await.unwrap();
        let entries = body["data"].as_array().unwrap();
        assert_eq!(entries.len(), 20);
        assert_eq!(entries[0]["number"], 1);
        assert_eq!(entries[0]["type"], "free_text");
        assert_eq!(entries[0]["type_label"], "Text Input");
        assert_eq!(entries[1]["type"], "choice_single");
        assert!(entries[1]["options"].as_array().unwrap().len() > 0);
        assert!(entries.iter().all(|entry| entry["response_count"] == 1));
    }

    #[backend_test]
    async fn question_edits_persist(client: Client) {
        let auth = admin_auth_header(&client).await;
        let response = client
            .put(uri!(update_question(5)))
            .header(auth.clone())
            .header(ContentType::JSON)
            .body(
                r#"{
                    "question_text": "Which channel do you usually order through?",
                    "type": "choice_single",
                    "options": ["Website", "Mobile app", "In store"]
                }"#,
            )
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["data"]["type"], "choice_single");

        let response = client.get("/questions/5").dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(
            body["data"]["question_text"],
            "Which channel do you usually order through?"
        );
        assert_eq!(body["data"]["options"][2], "In store");
    }

    #[backend_test]
    async fn bad_question_edits_are_rejected(client: Client) {
        let auth = admin_auth_header(&client).await;

        let response = client
            .put(uri!(update_question(999)))
            .header(auth.clone())
            .header(ContentType::JSON)
            .body(r#"{"question_text": "x", "type": "free_text", "options": null}"#)
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());

        let response = client
            .put(uri!(update_question(5)))
            .header(auth)
            .header(ContentType::JSON)
            .body(r#"{"question_text": "x", "type": "choice_single", "options": []}"#)
            .dispatch()
            .await;
        assert_eq!(Status::UnprocessableEntity, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(
            body["errors"]["options"][0],
            "Choice questions require at least one option."
        );
    }

    #[backend_test]
    async fn response_listing_searches_and_paginates(client: Client) {
        let mut answers = valid_answers();
        submit(&client, answers.clone()).await;
        answers[0].1 = "someone.else@example.org".to_string();
        submit(&client, answers).await;

        let auth = admin_auth_header(&client).await;

        let response = client
            .get("/admin/responses")
            .header(auth.clone())
            .dispatch()
            .await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["meta"]["total"], 2);
        assert_eq!(body["meta"]["current_page"], 1);
        assert_eq!(body["meta"]["last_page"], 1);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(
            body["data"][0]["answers"].as_array().unwrap().len(),
            20
        );

        // Substring search over email, case-insensitive.
        let response = client
            .get("/admin/responses?search=SOMEONE.else")
            .header(auth.clone())
            .dispatch()
            .await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["meta"]["total"], 1);
        assert_eq!(body["data"][0]["email"], "someone.else@example.org");

        // `.` in the search term is literal, not a wildcard.
        let response = client
            .get("/admin/responses?search=someone-else")
            .header(auth.clone())
            .dispatch()
            .await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["meta"]["total"], 0);

        // One row per page.
        let response = client
            .get("/admin/responses?per_page=1&page=2")
            .header(auth)
            .dispatch()
            .await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["meta"]["last_page"], 2);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[backend_test]
    async fn admin_endpoints_reject_anonymous_requests(client: Client) {
        for uri in [
            uri!(get_dashboard).to_string(),
            uri!(get_questionnaire).to_string(),
            "/admin/responses".to_string(),
        ] {
            let response = client.get(uri).dispatch().await;
            assert_eq!(Status::Unauthorized, response.status());
        }
    }
}
