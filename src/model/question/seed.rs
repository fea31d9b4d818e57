use log::info;
use mongodb::error::Error as DbError;

use crate::model::mongodb::Coll;

use super::{Question, QuestionType};

fn question(id: u32, text: &str, qtype: QuestionType, options: &[&str]) -> Question {
    Question {
        id,
        question_text: text.to_string(),
        qtype,
        options: if options.is_empty() {
            None
        } else {
            Some(options.iter().map(ToString::to_string).collect())
        },
    }
}

/// The 20 customer-satisfaction questions this deployment ships with.
pub fn seed_catalog() -> Vec<Question> {
    use QuestionType::{ChoiceSingle, FreeText, ScaleFive};

    vec![
        question(1, "What is your email address?", FreeText, &[]),
        question(
            2,
            "How satisfied are you with our product/service overall?",
            ChoiceSingle,
            &[
                "Very Satisfied",
                "Satisfied",
                "Neutral",
                "Dissatisfied",
                "Very Dissatisfied",
            ],
        ),
        question(
            3,
            "How would you rate the quality of our product?",
            ChoiceSingle,
            &["Excellent", "Good", "Average", "Poor", "Very Poor"],
        ),
        question(
            4,
            "How would you rate the value for money of our product/service?",
            ChoiceSingle,
            &["Excellent", "Good", "Fair", "Poor", "Very Poor"],
        ),
        question(
            5,
            "How satisfied are you with our customer service?",
            ChoiceSingle,
            &[
                "Very Satisfied",
                "Satisfied",
                "Neutral",
                "Dissatisfied",
                "Very Dissatisfied",
            ],
        ),
        question(
            6,
            "How often do you purchase from us?",
            ChoiceSingle,
            &["Weekly", "Monthly", "Quarterly", "Yearly", "First Time"],
        ),
        question(
            7,
            "How likely are you to recommend us to others?",
            ChoiceSingle,
            &["Very Likely", "Likely", "Neutral", "Unlikely", "Very Unlikely"],
        ),
        question(
            8,
            "What is your preferred method of contact?",
            ChoiceSingle,
            &["Email", "Phone", "Chat", "Social Media", "In-Person"],
        ),
        question(
            9,
            "How well were your issues resolved?",
            ChoiceSingle,
            &[
                "Completely Resolved",
                "Mostly Resolved",
                "Partially Resolved",
                "Not Resolved",
                "N/A",
            ],
        ),
        question(
            10,
            "Which product category do you purchase most?",
            ChoiceSingle,
            &[
                "Electronics",
                "Clothing",
                "Food & Beverage",
                "Home & Garden",
                "Other",
            ],
        ),
        question(11, "Rate the ease of use of our product (1-5)", ScaleFive, &[]),
        question(12, "Rate the features of our product (1-5)", ScaleFive, &[]),
        question(13, "Rate our delivery speed (1-5)", ScaleFive, &[]),
        question(14, "Rate your website/app experience (1-5)", ScaleFive, &[]),
        question(
            15,
            "Rate our pricing compared to competitors (1-5)",
            ScaleFive,
            &[],
        ),
        question(
            16,
            "What improvements would you suggest for our product/service?",
            FreeText,
            &[],
        ),
        question(
            17,
            "What do you like most about our product/service?",
            FreeText,
            &[],
        ),
        question(
            18,
            "What is your biggest challenge with our product/service?",
            FreeText,
            &[],
        ),
        question(
            19,
            "What additional products/services would you like us to offer?",
            FreeText,
            &[],
        ),
        question(20, "Any additional comments or feedback?", FreeText, &[]),
    ]
}

/// Seed the question catalog if the collection is empty.
///
/// This operation is idempotent; an already-populated (possibly
/// admin-edited) catalog is left untouched.
pub async fn ensure_questions_seeded(questions: &Coll<Question>) -> Result<(), DbError> {
    if questions.count_documents(None, None).await? == 0 {
        let catalog = seed_catalog();
        info!("Seeding question catalog with {} questions", catalog.len());
        questions.insert_many(catalog, None).await?;
    }
    Ok(())
}
