pub mod auth;
pub mod contacts;
pub mod error;
pub mod flash;
pub mod groups;
pub mod messages;
pub mod middleware;
pub mod pages;
pub mod requests;
pub mod router;
pub mod users;

pub use auth::{AppState, AppStateInner};
pub use middleware::SessionConfig;
pub use router::router;
