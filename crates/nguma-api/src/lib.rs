//! HTTP surface of the support backend: conversations, notifications, the
//! assistant and the email functions.

pub mod chat;
pub mod conversations;
pub mod email;
pub mod error;
pub mod knowledge;
pub mod middleware;
pub mod notifications;
pub mod queue;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner, ServiceSecrets};
