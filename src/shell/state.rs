use std::sync::Arc;

use crate::modules::assistant::agent::Agent;
use crate::modules::assistant::ws::ChatSessions;
use crate::modules::directory::store::Directory;
use crate::modules::identity::accounts::AccountService;
use crate::modules::identity::oauth::GoogleOAuth;
use crate::modules::scheduling::booking::BookingHandler;
use crate::modules::scheduling::calendar::CalendarGateway;
use crate::modules::scheduling::dashboards::DashboardService;
use crate::shared::config::Settings;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub directory: Arc<dyn Directory>,
    pub calendar: Arc<dyn CalendarGateway>,
    pub oauth: Arc<GoogleOAuth>,
    pub accounts: Arc<AccountService>,
    pub booking: Arc<BookingHandler>,
    pub dashboards: Arc<DashboardService>,
    pub agent: Arc<Agent>,
    pub chats: Arc<ChatSessions>,
}
