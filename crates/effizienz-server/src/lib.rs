pub mod auth;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod origin;
pub mod server;
pub mod token;

/// Shared application state threaded through axum handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Mints and checks `x-app-origin` tokens.
    pub origin: origin::OriginAuthenticator,
    /// Decides which request paths need a token at all.
    pub gate: gate::RouteGate,
}

pub use error::OriginError;
pub use gate::{GateMatch, RouteGate};
pub use origin::{Clock, ManualClock, OriginAuthenticator, OriginMode, OriginSecret, SystemClock};
pub use server::{build_router, generate_secret, read_secret_file, run, ServerConfig};
pub use token::{OriginToken, ORIGIN_HEADER, VALIDITY_WINDOW_MS};
