use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use tourdesk_core::{CoreError, CoreResult, GoogleIdentity, GoogleVerifier};

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const ISSUERS: &[&str] = &["accounts.google.com", "https://accounts.google.com"];

/// Google encodes booleans in tokeninfo responses as strings.
fn bool_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s.eq_ignore_ascii_case("true"),
    })
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    iss: String,
    sub: String,
    email: Option<String>,
    #[serde(default, deserialize_with = "bool_or_string")]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

impl TokenInfo {
    fn into_identity(self, client_id: &str) -> CoreResult<GoogleIdentity> {
        if self.aud != client_id {
            return Err(CoreError::IdentityError("token was issued for another client".into()));
        }
        if !ISSUERS.contains(&self.iss.as_str()) {
            return Err(CoreError::IdentityError(format!("unexpected issuer '{}'", self.iss)));
        }
        let email = self
            .email
            .ok_or_else(|| CoreError::IdentityError("token carries no email".into()))?;
        Ok(GoogleIdentity {
            sub: self.sub,
            email,
            email_verified: self.email_verified,
            name: self.name,
            picture: self.picture,
        })
    }
}

pub struct HttpGoogleVerifier {
    client: reqwest::Client,
    client_id: String,
}

impl HttpGoogleVerifier {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: client_id.into(),
        }
    }
}

#[async_trait]
impl GoogleVerifier for HttpGoogleVerifier {
    async fn verify_id_token(&self, id_token: &str) -> CoreResult<GoogleIdentity> {
        let response = self
            .client
            .get(TOKENINFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| CoreError::InternalError(format!("tokeninfo request failed: {}", e)))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Google rejected ID token");
            return Err(CoreError::IdentityError("invalid Google ID token".into()));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| CoreError::IdentityError(format!("malformed tokeninfo response: {}", e)))?;
        debug!(sub = %info.sub, "Google ID token verified");
        info.into_identity(&self.client_id)
    }
}
