use mongodb::bson::doc;
use mongodb::options::FindOptions;
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::api::common::ApiResponse;
use crate::error::{Error, Result};
use crate::model::{
    mongodb::{question_id_filter, Coll},
    question::Question,
};

pub fn routes() -> Vec<Route> {
    routes![list_questions, get_question]
}

/// Fetch the whole catalog in survey order.
pub async fn catalog(questions: &Coll<Question>) -> Result<Vec<Question>> {
    let options = FindOptions::builder().sort(doc! { "id": 1 }).build();
    Ok(questions.find(None, options).await?.try_collect().await?)
}

#[get("/questions")]
async fn list_questions(questions: Coll<Question>) -> Result<Json<ApiResponse<Vec<Question>>>> {
    let catalog = catalog(&questions).await?;
    Ok(ApiResponse::ok(catalog, "Questions retrieved successfully"))
}

#[get("/questions/<id>")]
async fn get_question(id: u32, questions: Coll<Question>) -> Result<Json<ApiResponse<Question>>> {
    let question = questions
        .find_one(question_id_filter(id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Question {id}")))?;
    Ok(ApiResponse::ok(question, "Question retrieved successfully"))
}
