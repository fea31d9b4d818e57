use std::collections::HashSet;

use mongodb::Client;
use serde::Deserialize;

use crate::error::{Result, ValidationErrors};
use crate::model::{
    mongodb::{Coll, Id},
    question::Question,
    response::{Answer, NewResponse, Response},
};

/// A survey submission as received on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    /// Top-level email; overridden by the answer to the designated email
    /// question whenever that answer is present.
    pub email: Option<String>,
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: u32,
    pub answer: String,
}

/// A submission that passed every precondition and is ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    pub email: String,
    /// Validator-normalised answers in submission order.
    pub answers: Vec<(u32, String)>,
}

/// Best-effort syntactic email check: an `@` with a non-empty local part and
/// a dot-carrying domain. Deliverability is out of scope.
pub fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || value.chars().count() > 255 {
        return false;
    }
    let Some((head, tail)) = domain.rsplit_once('.') else {
        return false;
    };
    !head.is_empty() && !tail.is_empty()
}

/// Validate a full submission against the current catalog.
///
/// Every precondition is checked before anything is persisted and all
/// failures are reported together, keyed by the offending field. The
/// effective email is taken from the answer to `email_question_id`,
/// overriding the caller's top-level field.
pub fn validate_submission(
    catalog: &[Question],
    email_question_id: u32,
    request: &SubmitRequest,
) -> std::result::Result<ValidSubmission, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    // Exactly one answer per catalog question: the count must match and
    // every entry must target a distinct, existing question.
    if request.answers.len() != catalog.len() {
        errors.add(
            "answers",
            format!("All {} questions must be answered.", catalog.len()),
        );
    }

    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(request.answers.len());
    for (index, entry) in request.answers.iter().enumerate() {
        let Some(question) = catalog.iter().find(|q| q.id == entry.question_id) else {
            errors.add(
                format!("answers.{index}.question_id"),
                "Invalid question ID provided.",
            );
            continue;
        };
        if !seen.insert(entry.question_id) {
            errors.add(
                format!("answers.{index}.question_id"),
                "Duplicate answer for question.",
            );
            continue;
        }
        match question.validate_answer(&entry.answer) {
            Ok(text) => normalized.push((entry.question_id, text)),
            Err(reason) => errors.add(format!("answers.{index}.answer"), reason),
        }
    }

    // The embedded email answer takes precedence over the top-level field.
    let embedded = request
        .answers
        .iter()
        .find(|entry| entry.question_id == email_question_id)
        .map(|entry| entry.answer.as_str());
    let email = embedded.or(request.email.as_deref()).unwrap_or_default();
    if email.is_empty() {
        errors.add("email", "Email address is required.");
    } else if !is_valid_email(email) {
        errors.add("email", "Please provide a valid email address.");
    }

    let submission = ValidSubmission {
        email: email.to_string(),
        answers: normalized,
    };
    errors.into_result(submission)
}

impl ValidSubmission {
    /// Persist the submission atomically: one response plus all its answers
    /// commit together or not at all. Any fault before the commit leaves the
    /// transaction to abort on drop, so a failed submission stores nothing.
    pub async fn store(
        self,
        db_client: &Client,
        new_responses: &Coll<NewResponse>,
        responses: &Coll<Response>,
        answers: &Coll<Answer>,
    ) -> Result<Response> {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        let response = NewResponse::new(self.email);
        let new_id: Id = new_responses
            .insert_one_with_session(&response, None, &mut session)
            .await?
            .inserted_id
            .as_object_id()
            .unwrap() // Valid because the ID comes directly from the DB
            .into();

        let rows = self
            .answers
            .into_iter()
            .map(|(question_id, answer_text)| Answer {
                response_id: new_id,
                question_id,
                answer_text,
            })
            .collect::<Vec<_>>();
        answers
            .insert_many_with_session(&rows, None, &mut session)
            .await?;

        let stored = responses
            .find_one_with_session(new_id.as_doc(), None, &mut session)
            .await?
            .unwrap(); // Inserted within this transaction

        session.commit_transaction().await?;
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::question::{seed_catalog, QuestionType};

    /// A fully valid payload for the seeded catalog.
    fn valid_request() -> SubmitRequest {
        let answers = seed_catalog()
            .iter()
            .map(|question| SubmittedAnswer {
                question_id: question.id,
                answer: match question.qtype {
                    QuestionType::ChoiceSingle => {
                        question.options.as_ref().unwrap()[0].clone()
                    }
                    QuestionType::ScaleFive => "4".to_string(),
                    QuestionType::FreeText if question.id == 1 => "a@b.com".to_string(),
                    QuestionType::FreeText => "All good.".to_string(),
                },
            })
            .collect();
        SubmitRequest {
            email: None,
            answers,
        }
    }

    #[test]
    fn accepts_a_complete_valid_submission() {
        let catalog = seed_catalog();
        let submission = validate_submission(&catalog, 1, &valid_request()).unwrap();
        assert_eq!(submission.email, "a@b.com");
        assert_eq!(submission.answers.len(), 20);
    }

    #[test]
    fn rejects_wrong_answer_counts() {
        let catalog = seed_catalog();

        let mut short = valid_request();
        short.answers.pop();
        let errors = validate_submission(&catalog, 1, &short).unwrap_err();
        assert_eq!(
            errors.reasons("answers"),
            Some(&vec!["All 20 questions must be answered.".to_string()])
        );

        let mut long = valid_request();
        long.answers.push(SubmittedAnswer {
            question_id: 20,
            answer: "extra".to_string(),
        });
        assert!(validate_submission(&catalog, 1, &long).is_err());
    }

    #[test]
    fn rejects_unknown_and_duplicate_question_ids() {
        let catalog = seed_catalog();

        let mut unknown = valid_request();
        unknown.answers[5].question_id = 999;
        let errors = validate_submission(&catalog, 1, &unknown).unwrap_err();
        assert!(errors.reasons("answers.5.question_id").is_some());

        let mut duplicated = valid_request();
        duplicated.answers[5].question_id = 7;
        duplicated.answers[5].answer = "Very Likely".to_string();
        let errors = validate_submission(&catalog, 1, &duplicated).unwrap_err();
        assert!(errors.reasons("answers.6.question_id").is_some());
    }

    #[test]
    fn attributes_type_failures_to_the_offending_answer() {
        let catalog = seed_catalog();
        let mut request = valid_request();
        request.answers[1].answer = "Not An Option".to_string();
        request.answers[10].answer = "6".to_string();

        let errors = validate_submission(&catalog, 1, &request).unwrap_err();
        assert_eq!(
            errors.reasons("answers.1.answer"),
            Some(&vec!["Please select a valid option.".to_string()])
        );
        assert_eq!(
            errors.reasons("answers.10.answer"),
            Some(&vec!["Rating cannot exceed 5.".to_string()])
        );
    }

    #[test]
    fn embedded_email_answer_overrides_top_level_field() {
        let catalog = seed_catalog();
        let mut request = valid_request();
        request.email = Some("someone-else@example.com".to_string());

        let submission = validate_submission(&catalog, 1, &request).unwrap();
        assert_eq!(submission.email, "a@b.com");
    }

    #[test]
    fn invalid_embedded_email_fails_even_with_valid_top_level() {
        let catalog = seed_catalog();
        let mut request = valid_request();
        request.answers[0].answer = "not-an-email".to_string();
        request.email = Some("valid@example.com".to_string());

        let errors = validate_submission(&catalog, 1, &request).unwrap_err();
        assert!(errors.reasons("email").is_some());
    }

    #[test]
    fn email_question_id_is_configuration() {
        let catalog = seed_catalog();
        // Designate question 16 (free text) as the email question instead.
        let mut request = valid_request();
        request.answers[15].answer = "other@domain.org".to_string();
        let submission = validate_submission(&catalog, 16, &request).unwrap();
        assert_eq!(submission.email, "other@domain.org");
    }

    #[test]
    fn email_syntax_rules() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last@sub.domain.co"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("plain"));
        assert!(!is_valid_email("user@nodot"));
        assert!(!is_valid_email("@domain.com"));
        assert!(!is_valid_email("user@.com"));
        assert!(!is_valid_email("user@domain."));
    }
}
