use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;

mod seed;

pub use seed::{ensure_questions_seeded, seed_catalog};

/// The survey question types.
///
/// The legacy deployment tagged these `A`/`B`/`C`; the wire tags below are
/// their readable replacements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Pick exactly one of a fixed option set.
    ChoiceSingle,
    /// Free-form text, at most 255 characters.
    FreeText,
    /// An integer rating from 1 to 5.
    ScaleFive,
}

impl QuestionType {
    /// Parse a wire tag, e.g. from an admin question update.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "choice_single" => Some(Self::ChoiceSingle),
            "free_text" => Some(Self::FreeText),
            "scale_five" => Some(Self::ScaleFive),
            _ => None,
        }
    }

    /// Human-readable label for admin views.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ChoiceSingle => "Multiple Choice",
            Self::FreeText => "Text Input",
            Self::ScaleFive => "Numeric Scale (1-5)",
        }
    }
}

impl From<QuestionType> for Bson {
    fn from(qtype: QuestionType) -> Self {
        to_bson(&qtype).expect("Serialisation is infallible")
    }
}

/// Maximum length of a free-text answer.
pub const FREE_TEXT_MAX_CHARS: usize = 255;

/// Maximum length of a question prompt.
const QUESTION_TEXT_MAX_CHARS: usize = 1000;

/// A single survey question.
///
/// Questions are seeded once and thereafter edited only through the admin
/// API; their `id` is stable and drives both submission and display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Stable catalog ID (1-based, ordering significant).
    pub id: u32,
    /// The prompt shown to the respondent.
    pub question_text: String,
    #[serde(rename = "type")]
    pub qtype: QuestionType,
    /// Option set; present iff `qtype` is `ChoiceSingle`.
    pub options: Option<Vec<String>>,
}

impl Question {
    /// Check a raw answer value against this question's type rule and return
    /// its canonical stored form.
    ///
    /// Purely a function of the question's type and options; it never
    /// consults other answers and has no side effects. Free text is stored
    /// verbatim (no trimming); ratings are re-rendered as decimal so the
    /// aggregator can rely on a canonical representation.
    pub fn validate_answer(&self, raw: &str) -> Result<String, String> {
        match self.qtype {
            QuestionType::ChoiceSingle => match &self.options {
                Some(options) if !options.is_empty() => {
                    if options.iter().any(|option| option == raw) {
                        Ok(raw.to_string())
                    } else {
                        Err("Please select a valid option.".to_string())
                    }
                }
                // A choice question that lost its options can only be
                // checked as text; see the catalog-edit notes in DESIGN.md.
                _ => Self::validate_free_text(raw),
            },
            QuestionType::FreeText => Self::validate_free_text(raw),
            QuestionType::ScaleFive => {
                let rating: i64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| "Rating must be a number.".to_string())?;
                if rating < 1 {
                    Err("Rating must be at least 1.".to_string())
                } else if rating > 5 {
                    Err("Rating cannot exceed 5.".to_string())
                } else {
                    Ok(rating.to_string())
                }
            }
        }
    }

    fn validate_free_text(raw: &str) -> Result<String, String> {
        if raw.is_empty() {
            Err("Answer is required for each question.".to_string())
        } else if raw.chars().count() > FREE_TEXT_MAX_CHARS {
            Err("Answer cannot exceed 255 characters.".to_string())
        } else {
            Ok(raw.to_string())
        }
    }

    /// Apply an admin edit. The catalog ID never changes.
    pub fn apply_update(&mut self, update: ValidQuestionUpdate) {
        self.question_text = update.question_text;
        self.qtype = update.qtype;
        self.options = update.options;
    }
}

/// An admin question edit, as received on the wire.
///
/// The type tag arrives as a plain string so that an unknown tag surfaces as
/// a field-level validation error rather than a body parse failure.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionUpdate {
    pub question_text: String,
    #[serde(rename = "type")]
    pub qtype: String,
    pub options: Option<Vec<String>>,
}

/// A question edit that passed validation.
#[derive(Debug, Clone)]
pub struct ValidQuestionUpdate {
    pub question_text: String,
    pub qtype: QuestionType,
    pub options: Option<Vec<String>>,
}

impl QuestionUpdate {
    /// Validate the edit, normalising the option set: only `ChoiceSingle`
    /// questions carry options.
    pub fn validate(self) -> Result<ValidQuestionUpdate, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.question_text.is_empty() {
            errors.add("question_text", "Question text is required.");
        } else if self.question_text.chars().count() > QUESTION_TEXT_MAX_CHARS {
            errors.add("question_text", "Question text is too long.");
        }

        let qtype = QuestionType::from_tag(&self.qtype);
        if qtype.is_none() {
            errors.add("type", "The selected type is invalid.");
        }

        let options = match qtype {
            Some(QuestionType::ChoiceSingle) => {
                let options = self.options.unwrap_or_default();
                if options.is_empty() {
                    errors.add("options", "Choice questions require at least one option.");
                }
                if options.iter().any(String::is_empty) {
                    errors.add("options", "Options cannot be empty.");
                }
                if options
                    .iter()
                    .any(|option| option.chars().count() > FREE_TEXT_MAX_CHARS)
                {
                    errors.add("options", "Options cannot exceed 255 characters.");
                }
                Some(options)
            }
            _ => None,
        };

        let update = ValidQuestionUpdate {
            question_text: self.question_text,
            // Placeholder is unreachable: `errors` is non-empty when
            // `qtype` failed to parse.
            qtype: qtype.unwrap_or(QuestionType::FreeText),
            options,
        };
        errors.into_result(update)
    }
}
