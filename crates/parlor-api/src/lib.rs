pub mod analytics;
pub mod auth;
pub mod conversations;
pub mod error;
pub mod handlers;
pub mod invites;
pub mod messages;
pub mod middleware;
pub mod moderation;
pub mod permissions;
pub mod pins;
pub mod polls;
pub mod reactions;
pub mod receipts;
pub mod state;

mod access;
mod system;

pub use error::{ApiError, ApiResult, ErrorKind};
pub use state::{AppState, AppStateInner};
