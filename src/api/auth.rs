use mongodb::bson::doc;
use rocket::{serde::json::Json, Route, State};
use serde::Serialize;

use crate::api::common::ApiResponse;
use crate::error::{Error, Result};
use crate::model::{
    admin::{AdminCredentials, AdminIdentity, AdminUser},
    auth::{AuthToken, TOKEN_TYPE},
    mongodb::Coll,
};
use crate::Config;

pub fn routes() -> Vec<Route> {
    routes![login, me, logout]
}

/// Successful login payload: who logged in plus the bearer token to use
/// for subsequent admin requests.
#[derive(Debug, Serialize)]
struct LoginData {
    user: AdminIdentity,
    token: String,
    token_type: &'static str,
}

#[post("/admin/login", data = "<credentials>", format = "json")]
async fn login(
    credentials: Json<AdminCredentials>,
    admins: Coll<AdminUser>,
    config: &State<Config>,
) -> Result<Json<ApiResponse<LoginData>>> {
    let with_email = doc! {
        "email": &credentials.email,
    };

    let admin = admins
        .find_one(with_email, None)
        .await?
        .filter(|admin| admin.verify_password(&credentials.password))
        .ok_or_else(|| Error::unauthorized("Invalid credentials"))?;

    // Valid credentials are not enough; the account must be on the admin
    // allow-list.
    if !config.is_admin(&admin.email) {
        return Err(Error::forbidden("Unauthorized access"));
    }

    let token = AuthToken::new(&admin);
    let data = LoginData {
        user: AdminIdentity::from(&admin),
        token: token.encode(config)?,
        token_type: TOKEN_TYPE,
    };
    Ok(ApiResponse::ok(data, "Login successful"))
}

#[get("/admin/me")]
async fn me(
    token: AuthToken,
    admins: Coll<AdminUser>,
) -> Result<Json<ApiResponse<AdminIdentity>>> {
    let admin = admins
        .find_one(doc! { "email": token.email() }, None)
        .await?
        .ok_or_else(|| Error::unauthorized("Invalid credentials"))?;
    Ok(ApiResponse::ok(
        AdminIdentity::from(&admin),
        "Authenticated user retrieved",
    ))
}

#[post("/admin/logout")]
async fn logout(_token: AuthToken) -> Json<ApiResponse<()>> {
    // Tokens are stateless, so logout is a client-side discard; this
    // endpoint just acknowledges it.
    ApiResponse::message_only("Logged out successfully")
}
