use rocket::{http::CookieJar, serde::json::Json, Route, State};

use crate::error::{Error, Result};
use crate::model::{
    admin::AdminCredentials,
    auth::{AuthToken, AUTH_TOKEN_COOKIE},
};
use crate::store::Store;
use crate::Config;

pub fn routes() -> Vec<Route> {
    routes![authenticate, logout]
}

#[post("/admin/login", data = "<credentials>", format = "json")]
pub async fn authenticate(
    cookies: &CookieJar<'_>,
    credentials: Json<AdminCredentials>,
    store: Store,
    config: &State<Config>,
) -> Result<()> {
    let admin = store
        .admin_by_username(&credentials.username)
        .await?
        .filter(|admin| admin.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::unauthorized(
                "No admin found with the provided username and password combination.",
            )
        })?;

    let token = AuthToken::new(&admin);
    cookies.add(token.into_cookie(config)?);
    info!("Admin {} logged in", admin.username);

    Ok(())
}

#[post("/admin/logout")]
pub async fn logout(cookies: &CookieJar<'_>) {
    cookies.remove(AUTH_TOKEN_COOKIE);
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json,
    };

    use super::*;

    async fn login(client: &Client, credentials: &AdminCredentials) -> Status {
        client
            .post(uri!(authenticate))
            .header(ContentType::JSON)
            .body(serde_json::to_string(credentials).unwrap())
            .dispatch()
            .await
            .status()
    }

    async fn admin_listing_status(client: &Client) -> Status {
        client.get("/admin/questions").dispatch().await.status()
    }

    #[backend_test]
    async fn anonymous_admin_requests_are_rejected(client: Client) {
        assert_eq!(admin_listing_status(&client).await, Status::Unauthorized);
    }

    #[backend_test]
    async fn login_logout(client: Client) {
        assert_eq!(login(&client, &AdminCredentials::example()).await, Status::Ok);
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
        assert_eq!(admin_listing_status(&client).await, Status::Ok);

        let response = client.post(uri!(logout)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_none());
        assert_eq!(admin_listing_status(&client).await, Status::Unauthorized);
    }

    #[backend_test]
    async fn bad_login(client: Client) {
        assert_eq!(
            login(&client, &AdminCredentials::wrong_password()).await,
            Status::Unauthorized
        );

        let stranger = AdminCredentials {
            username: "nobody".into(),
            password: AdminCredentials::example().password,
        };
        assert_eq!(login(&client, &stranger).await, Status::Unauthorized);

        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_none());
        assert_eq!(admin_listing_status(&client).await, Status::Unauthorized);
    }

    #[backend_test]
    async fn garbage_cookie_is_rejected(client: Client) {
        let response = client
            .get("/admin/questions")
            .cookie(rocket::http::Cookie::new(AUTH_TOKEN_COOKIE, "not.a.jwt"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
    }
}
