use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
};
use serde::Serialize;

/// Pagination parameters, parsed from `?page=&per_page=` with the same
/// defaults the legacy deployment used.
pub struct Pagination {
    page: u64,
    per_page: u64,
}

impl Pagination {
    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    pub fn meta(&self, total: u64) -> PageMeta {
        PageMeta {
            current_page: self.page,
            last_page: total.div_ceil(self.per_page).max(1),
            per_page: self.per_page,
            total,
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Pagination {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let page = match req.query_value::<u64>("page").unwrap_or(Ok(1)) {
            Ok(page) => page.max(1),
            Err(_) => return request::Outcome::Failure((Status::BadRequest, ())),
        };
        let per_page = match req.query_value::<u64>("per_page").unwrap_or(Ok(20)) {
            Ok(per_page) => per_page.clamp(1, 100),
            Err(_) => return request::Outcome::Failure((Status::BadRequest, ())),
        };
        request::Outcome::Success(Self { page, per_page })
    }
}

/// Standard pagination metadata attached to listing responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub current_page: u64,
    pub last_page: u64,
    pub per_page: u64,
    pub total: u64,
}
