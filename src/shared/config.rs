// Application settings, read once at startup.
//
// Every credential and tunable comes from the environment. Defaults match the
// deployment contract: listen on 0.0.0.0:8000, ping WebSocket clients every
// 10 seconds and drop them after 60 seconds of silence.

use std::env;

pub const GOOGLE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/calendar.events",
    "https://www.googleapis.com/auth/calendar.readonly",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
    "openid",
];

const DEFAULT_GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: String,
    pub port: u16,
    pub base_url: String,
    pub frontend_url: String,
    pub session_cookie_name: String,
    pub session_max_age: i64,
    pub cors_origins: Vec<String>,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_auth_uri: String,
    pub google_token_uri: String,
    pub google_scopes: Vec<String>,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub corpus_path: String,
    pub ws_ping_interval_secs: u64,
    pub ws_ping_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: "development".into(),
            port: 8000,
            base_url: "http://localhost:8000".into(),
            frontend_url: "http://localhost:8000".into(),
            session_cookie_name: "cece_doctor_session".into(),
            // 180 days
            session_max_age: 15_552_000,
            cors_origins: vec!["*".into()],
            google_client_id: String::new(),
            google_client_secret: String::new(),
            google_auth_uri: DEFAULT_GOOGLE_AUTH_URI.into(),
            google_token_uri: DEFAULT_GOOGLE_TOKEN_URI.into(),
            google_scopes: GOOGLE_SCOPES.iter().map(|s| s.to_string()).collect(),
            gemini_api_key: String::new(),
            gemini_model: "gemini-2.5-flash".into(),
            corpus_path: "corpus.txt".into(),
            ws_ping_interval_secs: 10,
            ws_ping_timeout_secs: 60,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Settings::default();
        Self {
            environment: var_or("ENVIRONMENT", &defaults.environment),
            port: parsed_var("PORT", defaults.port),
            base_url: var_or("BASE_URL", &defaults.base_url),
            frontend_url: var_or("FRONTEND_URL", &defaults.frontend_url),
            session_cookie_name: var_or("SESSION_COOKIE_NAME", &defaults.session_cookie_name),
            session_max_age: parsed_var("SESSION_MAX_AGE", defaults.session_max_age),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|origin| origin.trim().to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            google_client_id: var_or("GOOGLE_CLIENT_ID", ""),
            google_client_secret: var_or("GOOGLE_CLIENT_SECRET", ""),
            google_auth_uri: var_or("GOOGLE_AUTH_URI", &defaults.google_auth_uri),
            google_token_uri: var_or("GOOGLE_TOKEN_URI", &defaults.google_token_uri),
            google_scopes: defaults.google_scopes,
            gemini_api_key: var_or("GEMINI_API_KEY", ""),
            gemini_model: var_or("GEMINI_MODEL", &defaults.gemini_model),
            corpus_path: var_or("CORPUS_PATH", &defaults.corpus_path),
            ws_ping_interval_secs: parsed_var("WS_PING_INTERVAL_SECS", defaults.ws_ping_interval_secs),
            ws_ping_timeout_secs: parsed_var("WS_PING_TIMEOUT_SECS", defaults.ws_ping_timeout_secs),
        }
    }

    /// OAuth redirect URI registered with the Google console.
    pub fn redirect_uri(&self) -> String {
        format!("{}/auth/callback", self.base_url)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod settings_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn it_should_default_to_the_deployment_contract() {
        let settings = Settings::default();
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.ws_ping_interval_secs, 10);
        assert_eq!(settings.ws_ping_timeout_secs, 60);
        assert_eq!(settings.session_cookie_name, "cece_doctor_session");
    }

    #[rstest]
    fn it_should_derive_the_redirect_uri_from_the_base_url() {
        let mut settings = Settings::default();
        settings.base_url = "https://clinic.example.org".into();
        assert_eq!(
            settings.redirect_uri(),
            "https://clinic.example.org/auth/callback"
        );
    }

    #[rstest]
    fn it_should_only_report_production_for_the_production_environment() {
        let mut settings = Settings::default();
        assert!(!settings.is_production());
        settings.environment = "production".into();
        assert!(settings.is_production());
    }
}
