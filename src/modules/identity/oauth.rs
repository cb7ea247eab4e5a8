// Google OAuth authorization-code flow for calendar linking.

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::modules::directory::records::CalendarCredentials;
use crate::shared::config::Settings;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("token endpoint unreachable: {0}")]
    Network(String),

    #[error("token exchange rejected with status {status}")]
    Rejected { status: u16 },
}

pub struct GoogleOAuth {
    client_id: String,
    client_secret: String,
    auth_uri: String,
    token_uri: String,
    redirect_uri: String,
    scopes: Vec<String>,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

impl GoogleOAuth {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            client_id: settings.google_client_id.clone(),
            client_secret: settings.google_client_secret.clone(),
            auth_uri: settings.google_auth_uri.clone(),
            token_uri: settings.google_token_uri.clone(),
            redirect_uri: settings.redirect_uri(),
            scopes: settings.google_scopes.clone(),
            http: Client::new(),
        }
    }

    /// Consent-screen URL. `state` carries the doctor id through the round
    /// trip so the callback knows whose calendar to link.
    pub fn authorization_url(&self, state: &str) -> String {
        let scope = self.scopes.join(" ");
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}\
             &access_type=offline&prompt=consent&include_granted_scopes=true",
            self.auth_uri,
            query_encode(&self.client_id),
            query_encode(&self.redirect_uri),
            query_encode(&scope),
            query_encode(state),
        )
    }

    pub async fn exchange_code(&self, code: &str) -> Result<CalendarCredentials, OAuthError> {
        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let response = self
            .http
            .post(&self.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|err| OAuthError::Network(err.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuthError::Rejected {
                status: response.status().as_u16(),
            });
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| OAuthError::Network(err.to_string()))?;

        Ok(CalendarCredentials {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            token_uri: self.token_uri.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            scopes: self.scopes.clone(),
        })
    }
}

fn query_encode(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            other => {
                encoded.push('%');
                encoded.push_str(&format!("{other:02X}"));
            }
        }
    }
    encoded
}

#[cfg(test)]
mod google_oauth_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn it_should_percent_encode_query_values() {
        assert_eq!(query_encode("a b&c"), "a%20b%26c");
        assert_eq!(query_encode("safe-._~09Az"), "safe-._~09Az");
        assert_eq!(query_encode("https://x.test/cb"), "https%3A%2F%2Fx.test%2Fcb");
    }

    #[rstest]
    fn it_should_build_an_offline_consent_url_carrying_state() {
        let mut settings = Settings::default();
        settings.google_client_id = "client-123".into();
        settings.base_url = "https://clinic.example.org".into();
        let oauth = GoogleOAuth::from_settings(&settings);

        let url = oauth.authorization_url("doctor_42");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("state=doctor_42"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains(
            "redirect_uri=https%3A%2F%2Fclinic.example.org%2Fauth%2Fcallback"
        ));
        assert!(url.contains("calendar.events"));
    }
}
