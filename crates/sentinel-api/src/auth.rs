// Bearer-token authentication
//
// `POST /auth/login` exchanges a username/password for a JWT which is then
// attached to every request made through the client (and its clones).

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::client::SentinelClient;
use crate::error::Error;

/// The user record returned by `/auth/login` and `/auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
    pub role: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserInfo {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Successful login payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserInfo,
}

#[derive(Deserialize)]
struct LogoutResponse {
    #[allow(dead_code)]
    message: Option<String>,
}

impl SentinelClient {
    /// Authenticate with username/password.
    ///
    /// On success the bearer token is stored in the client and used for
    /// all subsequent requests.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<LoginResponse, Error> {
        let url = self.api_url("auth/login")?;
        debug!("logging in at {}", url);

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let resp: LoginResponse = self.post(url, &body).await.map_err(|e| match e {
            Error::Status { status, body } if (400..500).contains(&status) => {
                Error::Authentication {
                    message: format!("login failed (HTTP {status}): {body}"),
                }
            }
            other => other,
        })?;

        self.set_token(SecretString::from(resp.access_token.clone()));
        debug!(user = %resp.user.username, role = %resp.user.role, "login successful");
        Ok(resp)
    }

    /// Fetch the currently authenticated user (`GET /auth/me`).
    pub async fn me(&self) -> Result<UserInfo, Error> {
        if !self.has_token() {
            return Err(Error::NotLoggedIn);
        }
        let url = self.api_url("auth/me")?;
        self.get(url).await
    }

    /// End the session. The backend is stateless, so this mostly drops
    /// the local token; the server call is best-effort.
    pub async fn logout(&self) -> Result<(), Error> {
        let url = self.api_url("auth/logout")?;
        debug!("logging out at {}", url);
        let result: Result<LogoutResponse, Error> = self.post(url, &json!({})).await;
        self.clear_token();
        result.map(|_| ())
    }
}
