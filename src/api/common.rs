use rocket::serde::json::Json;
use serde::Serialize;

use crate::model::pagination::PageMeta;

/// The JSON envelope every endpoint responds with.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: Some(message.to_string()),
            meta: None,
        })
    }

    pub fn page(data: T, meta: PageMeta, message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: Some(message.to_string()),
            meta: Some(meta),
        })
    }
}

impl ApiResponse<()> {
    pub fn message_only(message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
            message: Some(message.to_string()),
            meta: None,
        })
    }

    pub fn failure(message: &str) -> Json<Self> {
        Json(Self {
            success: false,
            data: None,
            message: Some(message.to_string()),
            meta: None,
        })
    }
}
