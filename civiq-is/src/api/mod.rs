//! HTTP API handlers for civiq-is
//!
//! One module per resource; each exposes a `*_routes()` builder merged in
//! `crate::build_router`.

pub mod classify;
pub mod health;
pub mod issues;
pub mod profiles;
pub mod settings;
pub mod sse;
pub mod stats;
pub mod votes;

pub use classify::classify_routes;
pub use health::health_routes;
pub use issues::issue_routes;
pub use profiles::profile_routes;
pub use settings::settings_routes;
pub use sse::event_stream;
pub use stats::stats_routes;
pub use votes::vote_routes;
