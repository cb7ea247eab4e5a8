use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cece_backend::modules::assistant::agent::Agent;
use cece_backend::modules::assistant::gemini::GeminiProvider;
use cece_backend::modules::assistant::retrieval::CorpusIndex;
use cece_backend::modules::assistant::ws::ChatSessions;
use cece_backend::modules::directory::in_memory::InMemoryDirectory;
use cece_backend::modules::identity::accounts::AccountService;
use cece_backend::modules::identity::oauth::GoogleOAuth;
use cece_backend::modules::scheduling::booking::BookingHandler;
use cece_backend::modules::scheduling::dashboards::DashboardService;
use cece_backend::modules::scheduling::google_calendar::GoogleCalendar;
use cece_backend::shared::config::Settings;
use cece_backend::shell::http::router;
use cece_backend::shell::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Arc::new(Settings::from_env());

    let corpus = match tokio::fs::read_to_string(&settings.corpus_path).await {
        Ok(text) => CorpusIndex::from_text(&text),
        Err(error) => {
            warn!(path = %settings.corpus_path, %error, "corpus unavailable, inquiries get no context");
            CorpusIndex::empty()
        }
    };

    let directory = Arc::new(InMemoryDirectory::new());
    let calendar = Arc::new(GoogleCalendar::new());
    let oauth = Arc::new(GoogleOAuth::from_settings(&settings));
    let accounts = Arc::new(AccountService::new(directory.clone()));
    let booking = Arc::new(BookingHandler::new(directory.clone(), calendar.clone()));
    let dashboards = Arc::new(DashboardService::new(directory.clone(), calendar.clone()));
    let agent = Arc::new(Agent::new(
        Arc::new(GeminiProvider::from_settings(&settings)),
        Arc::new(corpus),
    ));

    let state = AppState {
        settings: settings.clone(),
        directory,
        calendar,
        oauth,
        accounts,
        booking,
        dashboards,
        agent,
        chats: Arc::new(ChatSessions::new()),
    };

    let listener = TcpListener::bind(("0.0.0.0", settings.port))
        .await
        .with_context(|| format!("failed to bind 0.0.0.0:{}", settings.port))?;
    info!(port = settings.port, environment = %settings.environment, "listening");

    axum::serve(listener, router(state))
        .await
        .context("server exited")?;
    Ok(())
}
