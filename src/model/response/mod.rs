use chrono::{DateTime, SecondsFormat, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::mongodb::Id;
use crate::model::question::Question;

/// A stored survey response.
///
/// The numeric `_id` stays internal; the random `token` is the only identity
/// ever handed to respondents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "_id")]
    pub id: Id,
    pub token: String,
    pub email: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// A response that has not been inserted yet, so has no ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewResponse {
    pub token: String,
    pub email: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl NewResponse {
    /// Create a response for the given respondent, minting a fresh access
    /// token. UUID v4 gives 122 random bits; the token must be unguessable
    /// since holding it is the only access control on the response.
    pub fn new(email: String) -> Self {
        Self {
            token: Uuid::new_v4().to_string(),
            email,
            created_at: Utc::now(),
        }
    }
}

/// One stored answer, a child of exactly one response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub response_id: Id,
    pub question_id: u32,
    /// The canonical answer value; ratings are stored as decimal strings.
    pub answer_text: String,
}

/// An answer as rendered for the public token lookup, joined to its question
/// so the caller can reconstruct a readable view without further requests.
#[derive(Debug, Serialize)]
pub struct AnswerResource {
    pub question_id: u32,
    pub question: Option<Question>,
    pub answer_text: String,
}

/// A response as rendered for the public token lookup.
#[derive(Debug, Serialize)]
pub struct ResponseResource {
    pub token: String,
    pub email: String,
    pub submitted_at: String,
    pub formatted_date: String,
    pub answers: Vec<AnswerResource>,
    pub response_url: String,
}

impl ResponseResource {
    pub fn assemble(
        response: Response,
        answers: Vec<Answer>,
        catalog: &[Question],
        hostname: &str,
    ) -> Self {
        let answers = answers
            .into_iter()
            .map(|answer| AnswerResource {
                question_id: answer.question_id,
                question: catalog
                    .iter()
                    .find(|question| question.id == answer.question_id)
                    .cloned(),
                answer_text: answer.answer_text,
            })
            .collect();
        Self {
            response_url: format!("{hostname}/response/{}", response.token),
            token: response.token,
            email: response.email,
            submitted_at: response
                .created_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            formatted_date: response
                .created_at
                .format("%B %-d, %Y %-I:%M %p")
                .to_string(),
            answers,
        }
    }
}

/// An answer row in the admin response browser.
#[derive(Debug, Serialize)]
pub struct AdminAnswerRow {
    pub question_id: u32,
    pub question_text: String,
    pub answer: String,
    #[serde(rename = "type")]
    pub qtype: Option<crate::model::question::QuestionType>,
}

/// A response row in the admin response browser.
#[derive(Debug, Serialize)]
pub struct AdminResponseRow {
    pub id: String,
    pub token: String,
    pub email: String,
    pub submitted_at: String,
    pub answers: Vec<AdminAnswerRow>,
}

impl AdminResponseRow {
    pub fn assemble(response: Response, answers: Vec<Answer>, catalog: &[Question]) -> Self {
        let answers = answers
            .into_iter()
            .map(|answer| {
                let question = catalog
                    .iter()
                    .find(|question| question.id == answer.question_id);
                AdminAnswerRow {
                    question_id: answer.question_id,
                    question_text: question
                        .map(|question| question.question_text.clone())
                        .unwrap_or_default(),
                    answer: answer.answer_text,
                    qtype: question.map(|question| question.qtype),
                }
            })
            .collect();
        Self {
            id: response.id.to_string(),
            token: response.token,
            email: response.email,
            submitted_at: response
                .created_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            answers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::question::seed_catalog;
    use chrono::TimeZone;

    fn stored_response() -> Response {
        Response {
            id: Id::new(),
            token: Uuid::new_v4().to_string(),
            email: "a@b.com".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 8, 29, 14, 5, 0).unwrap(),
        }
    }

    #[test]
    fn tokens_are_random_uuids() {
        let a = NewResponse::new("a@b.com".to_string());
        let b = NewResponse::new("a@b.com".to_string());
        assert_ne!(a.token, b.token);
        assert!(Uuid::parse_str(&a.token).is_ok());
    }

    #[test]
    fn resource_joins_answers_to_questions() {
        let catalog = seed_catalog();
        let response = stored_response();
        let answers = vec![
            Answer {
                response_id: response.id,
                question_id: 1,
                answer_text: "a@b.com".to_string(),
            },
            Answer {
                response_id: response.id,
                question_id: 11,
                answer_text: "4".to_string(),
            },
        ];

        let resource =
            ResponseResource::assemble(response.clone(), answers, &catalog, "http://localhost");

        assert_eq!(resource.token, response.token);
        assert_eq!(
            resource.response_url,
            format!("http://localhost/response/{}", response.token)
        );
        assert_eq!(resource.answers.len(), 2);
        let rating = &resource.answers[1];
        assert_eq!(
            rating.question.as_ref().unwrap().question_text,
            "Rate the ease of use of our product (1-5)"
        );
        assert_eq!(rating.answer_text, "4");
    }

    #[test]
    fn admin_row_tolerates_deleted_questions() {
        let response = stored_response();
        let answers = vec![Answer {
            response_id: response.id,
            question_id: 99,
            answer_text: "orphaned".to_string(),
        }];
        let row = AdminResponseRow::assemble(response, answers, &seed_catalog());
        assert_eq!(row.answers[0].question_text, "");
        assert_eq!(row.answers[0].qtype, None);
        assert_eq!(row.submitted_at, "2026-08-29 14:05:00");
    }
}
