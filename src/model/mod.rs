pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod mongodb;
pub mod pagination;
pub mod question;
pub mod response;
pub mod submission;
