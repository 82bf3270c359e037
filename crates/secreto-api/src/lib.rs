pub mod auth;
pub mod draw;
pub mod error;
pub mod middleware;
pub mod participants;
pub mod router;
pub mod survey;

pub use auth::{AppState, AppStateInner};
pub use router::router;
