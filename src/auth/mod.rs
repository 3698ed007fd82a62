//! Authentication state consumed by the caching layer.

mod gate;
mod session;

pub use gate::{AuthGate, AuthStatus};
pub use session::{SessionData, SessionStore};
