use std::sync::Arc;

use parlor_db::Database;
use parlor_gateway::Dispatcher;

use crate::analytics::Analytics;
use crate::moderation::ModerationGate;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub dispatcher: Dispatcher,
    pub moderation: ModerationGate,
    pub analytics: Analytics,
    pub jwt_secret: String,
}
