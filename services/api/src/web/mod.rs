pub mod assistant;
pub mod auth;
pub mod bookings;
pub mod doctors;
pub mod errors;
pub mod middleware;
pub mod otp;
pub mod rest;
pub mod state;

// Re-export what the binaries need to assemble the server.
pub use middleware::require_auth;
pub use rest::{build_router, ApiDoc};
pub use state::AppState;
